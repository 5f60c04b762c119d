//! # Simulator State Layouts
//!
//! Plain-old-data layouts matching the batched tensors a GPU rigid-body
//! simulator exposes. Quaternions are stored `xyzw`.

use glam::{Quat, Vec3};

/// State of one rigid body: position, orientation, linear and angular
/// velocity, all in the world frame (13 floats).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RigidBodyState {
    pub pos: [f32; 3],
    pub rot: [f32; 4],
    pub lin_vel: [f32; 3],
    pub ang_vel: [f32; 3],
}

/// The root (base link) of an actor uses the rigid-body layout.
pub type RootState = RigidBodyState;

impl RigidBodyState {
    pub const FLOATS: usize = 13;

    /// Body at `pos` with identity orientation and zero velocity.
    #[must_use]
    pub const fn at(pos: [f32; 3]) -> Self {
        Self {
            pos,
            rot: [0.0, 0.0, 0.0, 1.0],
            lin_vel: [0.0; 3],
            ang_vel: [0.0; 3],
        }
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.pos)
    }

    #[must_use]
    pub fn orientation(&self) -> Quat {
        Quat::from_array(self.rot)
    }

    #[must_use]
    pub fn linear_velocity(&self) -> Vec3 {
        Vec3::from_array(self.lin_vel)
    }

    #[must_use]
    pub fn angular_velocity(&self) -> Vec3 {
        Vec3::from_array(self.ang_vel)
    }

    pub fn set_position(&mut self, pos: Vec3) {
        self.pos = pos.to_array();
    }

    pub fn set_orientation(&mut self, rot: Quat) {
        self.rot = rot.to_array();
    }

    /// Linear followed by angular velocity, the six trailing floats.
    #[must_use]
    pub fn velocity6(&self) -> [f32; 6] {
        let [vx, vy, vz] = self.lin_vel;
        let [wx, wy, wz] = self.ang_vel;
        [vx, vy, vz, wx, wy, wz]
    }
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self::at([0.0; 3])
    }
}

/// Position and velocity of a single degree of freedom.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DofState {
    pub pos: f32,
    pub vel: f32,
}

/// Net contact force acting on one rigid body, world frame.
pub type ContactForce = [f32; 3];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_simulator_tensor() {
        assert_eq!(std::mem::size_of::<RigidBodyState>(), RigidBodyState::FLOATS * 4);
        assert_eq!(std::mem::size_of::<DofState>(), 8);
        let states = [RigidBodyState::at([1.0, 2.0, 3.0])];
        let floats: &[f32] = bytemuck::cast_slice(&states);
        assert_eq!(&floats[..7], &[1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0]);
    }
}
