//! # Kinematic Mock Backend
//!
//! A small CPU stand-in for the GPU simulator, good enough to drive the
//! environment pipeline in tests, benches and the runtime driver. Joints are
//! integrated from torques with a fixed armature, the root drifts with its
//! own damped velocity, and every other body is rigidly attached to the root
//! at a fixed offset. Bodies close to the ground report a vertical contact
//! force sharing the robot weight.

use glam::{Quat, Vec3};
use tracing::{debug, trace};

use crate::backend::SimBackend;
use crate::error::PhysicsError;
use crate::tensors::SimTensors;
use crate::types::{DofState, RigidBodyState};

const GRAVITY: f32 = 9.81;

#[derive(Clone, Debug)]
pub struct MockSimConfig {
    pub num_envs: usize,
    pub num_dof: usize,
    /// Offsets of every body from the root in the root frame; body 0 is the
    /// base itself and should be zero.
    pub body_offsets: Vec<[f32; 3]>,
    /// Physics sub-step in seconds.
    pub dt: f32,
    pub armature: f32,
    pub joint_damping: f32,
    pub root_damping: f32,
    pub mass: f32,
    /// Bodies below this height are in contact.
    pub contact_height: f32,
    pub min_root_height: f32,
}

impl Default for MockSimConfig {
    fn default() -> Self {
        // Base, then (hip, thigh, calf, foot) for FL, FR, RL, RR.
        let mut body_offsets = vec![[0.0, 0.0, 0.0]];
        for (x, y) in [(0.24, 0.09), (0.24, -0.09), (-0.24, 0.09), (-0.24, -0.09)] {
            body_offsets.push([x, y, 0.0]);
            body_offsets.push([x, y, -0.1]);
            body_offsets.push([x, y, -0.2]);
            body_offsets.push([x, y, -0.3]);
        }
        Self {
            num_envs: 1,
            num_dof: 12,
            body_offsets,
            dt: 0.005,
            armature: 0.05,
            joint_damping: 0.1,
            root_damping: 0.98,
            mass: 8.0,
            contact_height: 0.02,
            min_root_height: 0.05,
        }
    }
}

pub struct MockSim {
    config: MockSimConfig,
    state: SimTensors,
    torques: Vec<f32>,
}

impl MockSim {
    #[must_use]
    pub fn new(config: MockSimConfig) -> Self {
        let state = SimTensors::zeros(config.num_envs, config.body_offsets.len(), config.num_dof);
        let torques = vec![0.0; config.num_envs * config.num_dof];
        let mut sim = Self { config, state, torques };
        for env in 0..sim.config.num_envs {
            sim.place_bodies(env);
        }
        debug!(
            num_envs = sim.config.num_envs,
            num_bodies = sim.state.num_bodies,
            "mock simulator created"
        );
        sim
    }

    #[must_use]
    pub fn config(&self) -> &MockSimConfig {
        &self.config
    }

    /// Direct access to the simulator-side state, for tests.
    #[must_use]
    pub fn state(&self) -> &SimTensors {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SimTensors {
        &mut self.state
    }

    fn place_bodies(&mut self, env: usize) {
        let root = self.state.root[env];
        let pos = root.position();
        let rot = root.orientation().normalize();
        let lin_vel = root.linear_velocity();
        let ang_vel = root.angular_velocity();

        let mut contacts = Vec::new();
        for (body, offset) in self.config.body_offsets.iter().enumerate() {
            let arm = rot * Vec3::from_array(*offset);
            let state = self.state.body_mut(env, body);
            state.set_position(pos + arm);
            state.set_orientation(rot);
            state.lin_vel = (lin_vel + ang_vel.cross(arm)).to_array();
            state.ang_vel = root.ang_vel;
            if body > 0 && state.pos[2] < self.config.contact_height {
                contacts.push(body);
            }
        }

        let num_bodies = self.state.num_bodies;
        for force in &mut self.state.contact_forces[env * num_bodies..(env + 1) * num_bodies] {
            *force = [0.0; 3];
        }
        if !contacts.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let share = self.config.mass * GRAVITY / contacts.len() as f32;
            for body in contacts {
                self.state.contact_forces[env * num_bodies + body] = [0.0, 0.0, share];
            }
        }
    }

    fn check_tensors(&self, tensors: &SimTensors) -> Result<(), PhysicsError> {
        if tensors.num_envs != self.state.num_envs
            || tensors.num_bodies != self.state.num_bodies
            || tensors.num_dof != self.state.num_dof
        {
            return Err(PhysicsError::ShapeMismatch("tensor counts differ from simulator"));
        }
        tensors.check_shapes()
    }
}

impl SimBackend for MockSim {
    fn num_envs(&self) -> usize {
        self.state.num_envs
    }

    fn num_bodies(&self) -> usize {
        self.state.num_bodies
    }

    fn num_dof(&self) -> usize {
        self.state.num_dof
    }

    fn set_dof_actuation_force(&mut self, torques: &[f32]) -> Result<(), PhysicsError> {
        if torques.len() != self.torques.len() {
            return Err(PhysicsError::ShapeMismatch("torque buffer length != num_envs * num_dof"));
        }
        self.torques.copy_from_slice(torques);
        Ok(())
    }

    fn simulate(&mut self) -> Result<(), PhysicsError> {
        let dt = self.config.dt;
        for (dof, &torque) in self.state.dofs.iter_mut().zip(&self.torques) {
            let acc = (torque - self.config.joint_damping * dof.vel) / self.config.armature;
            dof.vel += acc * dt;
            dof.pos += dof.vel * dt;
        }

        for env in 0..self.state.num_envs {
            let root = &mut self.state.root[env];
            let lin_vel = root.linear_velocity() * self.config.root_damping;
            let ang_vel = root.angular_velocity() * self.config.root_damping;
            let mut pos = root.position() + lin_vel * dt;
            pos.z = pos.z.max(self.config.min_root_height);
            let spin = Quat::from_scaled_axis(ang_vel * dt);
            let rot = (spin * root.orientation()).normalize();
            root.set_position(pos);
            root.set_orientation(rot);
            root.lin_vel = lin_vel.to_array();
            root.ang_vel = ang_vel.to_array();
            self.place_bodies(env);
        }
        Ok(())
    }

    fn refresh_dof_state(&mut self, tensors: &mut SimTensors) -> Result<(), PhysicsError> {
        self.check_tensors(tensors)?;
        tensors.dofs.copy_from_slice(&self.state.dofs);
        Ok(())
    }

    fn refresh(&mut self, tensors: &mut SimTensors) -> Result<(), PhysicsError> {
        self.check_tensors(tensors)?;
        tensors.root.copy_from_slice(&self.state.root);
        tensors.bodies.copy_from_slice(&self.state.bodies);
        tensors.contact_forces.copy_from_slice(&self.state.contact_forces);
        tensors.dofs.copy_from_slice(&self.state.dofs);
        Ok(())
    }

    fn set_dof_state_indexed(
        &mut self,
        tensors: &SimTensors,
        env_ids: &[usize],
    ) -> Result<(), PhysicsError> {
        self.check_tensors(tensors)?;
        self.state.check_env_ids(env_ids)?;
        for &env in env_ids {
            let src: &[DofState] = tensors.env_dofs(env);
            self.state.env_dofs_mut(env).copy_from_slice(src);
        }
        Ok(())
    }

    fn set_root_state_indexed(
        &mut self,
        tensors: &SimTensors,
        env_ids: &[usize],
    ) -> Result<(), PhysicsError> {
        self.check_tensors(tensors)?;
        self.state.check_env_ids(env_ids)?;
        for &env in env_ids {
            self.state.root[env] = tensors.root[env];
            self.place_bodies(env);
        }
        trace!(count = env_ids.len(), "root states written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feet_touching_ground_carry_the_weight() {
        let mut sim = MockSim::new(MockSimConfig::default());
        sim.state_mut().root[0] = RigidBodyState::at([0.0, 0.0, 0.3]);
        sim.simulate().unwrap();
        let state = sim.state();
        let total: f32 = state.contact_forces.iter().map(|f| f[2]).sum();
        assert!((total - 8.0 * GRAVITY).abs() < 1e-3, "total={total}");
        // feet are every fourth body after the base
        for foot in [4, 8, 12, 16] {
            assert!(state.contact_force(0, foot)[2] > 0.0);
        }
        assert_eq!(state.contact_force(0, 1)[2], 0.0);
    }

    #[test]
    fn indexed_root_write_leaves_other_envs_alone() {
        let mut sim = MockSim::new(MockSimConfig { num_envs: 3, ..MockSimConfig::default() });
        let mut tensors = SimTensors::zeros(3, sim.num_bodies(), sim.num_dof());
        sim.refresh(&mut tensors).unwrap();
        for root in &mut tensors.root {
            root.pos = [7.0, 7.0, 7.0];
        }
        sim.set_root_state_indexed(&tensors, &[1]).unwrap();
        assert_eq!(sim.state().root[1].pos, [7.0, 7.0, 7.0]);
        assert_eq!(sim.state().root[0].pos, [0.0, 0.0, 0.0]);
        assert_eq!(sim.state().root[2].pos, [0.0, 0.0, 0.0]);
        assert!(sim.set_root_state_indexed(&tensors, &[3]).is_err());
    }

    #[test]
    fn torque_drives_joint() {
        let mut sim = MockSim::new(MockSimConfig::default());
        let mut torques = vec![0.0; 12];
        torques[0] = 1.0;
        sim.set_dof_actuation_force(&torques).unwrap();
        sim.simulate().unwrap();
        assert!(sim.state().dofs[0].vel > 0.0);
        assert_eq!(sim.state().dofs[1].vel, 0.0);
    }
}
