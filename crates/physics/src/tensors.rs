//! # Batched Simulator Tensors
//!
//! Host-side copies of the simulator state for `num_envs` environments
//! stepping in lockstep. Every buffer is a flat array indexed first by
//! environment id, matching the layout of the simulator's wrapped tensors.

use crate::error::PhysicsError;
use crate::types::{ContactForce, DofState, RigidBodyState, RootState};

#[derive(Clone, Debug)]
pub struct SimTensors {
    pub num_envs: usize,
    pub num_bodies: usize,
    pub num_dof: usize,
    /// One root state per environment.
    pub root: Vec<RootState>,
    /// `num_envs * num_bodies` rigid-body states.
    pub bodies: Vec<RigidBodyState>,
    /// `num_envs * num_bodies` net contact forces.
    pub contact_forces: Vec<ContactForce>,
    /// `num_envs * num_dof` joint states.
    pub dofs: Vec<DofState>,
}

impl SimTensors {
    #[must_use]
    pub fn zeros(num_envs: usize, num_bodies: usize, num_dof: usize) -> Self {
        Self {
            num_envs,
            num_bodies,
            num_dof,
            root: vec![RootState::default(); num_envs],
            bodies: vec![RigidBodyState::default(); num_envs * num_bodies],
            contact_forces: vec![[0.0; 3]; num_envs * num_bodies],
            dofs: vec![DofState::default(); num_envs * num_dof],
        }
    }

    #[must_use]
    pub fn body(&self, env: usize, body: usize) -> &RigidBodyState {
        &self.bodies[env * self.num_bodies + body]
    }

    pub fn body_mut(&mut self, env: usize, body: usize) -> &mut RigidBodyState {
        &mut self.bodies[env * self.num_bodies + body]
    }

    #[must_use]
    pub fn contact_force(&self, env: usize, body: usize) -> ContactForce {
        self.contact_forces[env * self.num_bodies + body]
    }

    #[must_use]
    pub fn env_dofs(&self, env: usize) -> &[DofState] {
        &self.dofs[env * self.num_dof..(env + 1) * self.num_dof]
    }

    pub fn env_dofs_mut(&mut self, env: usize) -> &mut [DofState] {
        &mut self.dofs[env * self.num_dof..(env + 1) * self.num_dof]
    }

    /// Checks that every buffer has the length implied by the counts.
    ///
    /// # Errors
    /// Returns [`PhysicsError::ShapeMismatch`] naming the first bad buffer.
    pub fn check_shapes(&self) -> Result<(), PhysicsError> {
        if self.root.len() != self.num_envs {
            return Err(PhysicsError::ShapeMismatch("root tensor length != num_envs"));
        }
        if self.bodies.len() != self.num_envs * self.num_bodies {
            return Err(PhysicsError::ShapeMismatch(
                "rigid body tensor length != num_envs * num_bodies",
            ));
        }
        if self.contact_forces.len() != self.num_envs * self.num_bodies {
            return Err(PhysicsError::ShapeMismatch(
                "contact force tensor length != num_envs * num_bodies",
            ));
        }
        if self.dofs.len() != self.num_envs * self.num_dof {
            return Err(PhysicsError::ShapeMismatch("dof tensor length != num_envs * num_dof"));
        }
        Ok(())
    }

    /// Rejects any id outside `0..num_envs`.
    ///
    /// # Errors
    /// Returns [`PhysicsError::EnvIndexOutOfRange`] for the first such id.
    pub fn check_env_ids(&self, env_ids: &[usize]) -> Result<(), PhysicsError> {
        match env_ids.iter().find(|&&id| id >= self.num_envs) {
            Some(&index) => Err(PhysicsError::EnvIndexOutOfRange {
                index,
                num_envs: self.num_envs,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_env_major() {
        let mut t = SimTensors::zeros(2, 3, 4);
        t.body_mut(1, 2).pos = [5.0, 0.0, 0.0];
        assert_eq!(t.bodies[5].pos[0], 5.0);
        t.env_dofs_mut(1)[0].pos = 1.5;
        assert_eq!(t.dofs[4].pos, 1.5);
        assert!(t.check_shapes().is_ok());
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let t = SimTensors::zeros(2, 1, 1);
        assert!(t.check_env_ids(&[0, 1]).is_ok());
        assert!(matches!(
            t.check_env_ids(&[0, 2]),
            Err(PhysicsError::EnvIndexOutOfRange { index: 2, num_envs: 2 })
        ));
    }
}
