//! # Per-Environment Buffers
//!
//! All buffers are parallel arrays indexed by environment id. The raw
//! simulator copy lives in [`WalkState::tensors`]; everything else is either
//! derived from it each step, a command/action buffer, or a one-step history
//! snapshot taken after rewards are computed.

use glam::{Quat, Vec3};
use physics::SimTensors;

use crate::config::{AssetConfig, WalkConfig};
use crate::gait::FootPhases;
use crate::math::{heading_of, quat_rotate_inverse};
use crate::terrain::Terrain;
use crate::{NUM_DOF, NUM_LEGS};

/// Body indices and reference axes of the robot model.
#[derive(Clone, Debug)]
pub struct RobotLayout {
    pub feet: [usize; NUM_LEGS],
    pub calves: [usize; NUM_LEGS],
    pub termination_contacts: Vec<usize>,
    pub gravity: Vec3,
    pub forward: Vec3,
    pub upright: Vec3,
    pub heading_axis: Vec3,
}

impl RobotLayout {
    #[must_use]
    pub fn new(asset: &AssetConfig) -> Self {
        Self {
            feet: asset.feet_indices,
            calves: asset.calf_indices,
            termination_contacts: asset.termination_contact_indices.clone(),
            gravity: Vec3::NEG_Z,
            forward: Vec3::from_array(asset.forward_vec),
            upright: Vec3::from_array(asset.upright_vec),
            heading_axis: Vec3::from_array(asset.heading_vec),
        }
    }
}

/// Foot and calf kinematics of one robot, world frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FootKinematics {
    pub pos: [Vec3; NUM_LEGS],
    pub vel: [Vec3; NUM_LEGS],
    pub ang_vel: [Vec3; NUM_LEGS],
    pub calf_pos: [Vec3; NUM_LEGS],
    /// Terrain height below each foot.
    pub terrain: [f32; NUM_LEGS],
}

impl FootKinematics {
    /// Foot height above the terrain below it.
    #[must_use]
    pub fn clearance(&self, foot: usize) -> f32 {
        self.pos[foot].z - self.terrain[foot]
    }

    /// Mean terrain height under the two rear feet.
    #[must_use]
    pub fn rear_terrain(&self) -> f32 {
        0.5 * (self.terrain[2] + self.terrain[3])
    }
}

#[derive(Clone, Debug)]
pub struct WalkState {
    pub num_envs: usize,
    pub layout: RobotLayout,
    pub tensors: SimTensors,

    // derived every step
    pub base_pos: Vec<Vec3>,
    pub base_quat: Vec<Quat>,
    pub base_lin_vel: Vec<Vec3>,
    pub base_ang_vel: Vec<Vec3>,
    pub projected_gravity: Vec<Vec3>,
    pub projected_forward: Vec<Vec3>,
    pub heading: Vec<f32>,
    pub feet: Vec<FootKinematics>,

    /// `[lin_vel_x, lin_vel_y, ang_vel, heading]`.
    pub commands: Vec<[f32; 4]>,
    pub actions: Vec<[f32; NUM_DOF]>,
    pub torques: Vec<[f32; NUM_DOF]>,
    pub gait_index: Vec<f32>,
    pub phases: Vec<FootPhases>,

    // one-step history
    pub last_actions: Vec<[f32; NUM_DOF]>,
    pub last_dof_pos: Vec<[f32; NUM_DOF]>,
    pub last_dof_vel: Vec<[f32; NUM_DOF]>,
    pub last_root_vel: Vec<[f32; 6]>,
    pub last_heading: Vec<f32>,
    /// Foot positions captured at the first step of each episode.
    pub init_feet_positions: Vec<[Vec3; NUM_LEGS]>,

    // episode bookkeeping
    pub episode_length: Vec<u32>,
    pub reset_buf: Vec<bool>,
    pub time_out_buf: Vec<bool>,
    pub power_sum: Vec<f32>,
    pub common_step_counter: u64,
    pub env_origins: Vec<Vec3>,
    pub env_origins_new: Vec<Vec3>,
}

impl WalkState {
    #[must_use]
    pub fn new(config: &WalkConfig, num_bodies: usize) -> Self {
        let n = config.env.num_envs;
        let env_origins = grid_origins(n, config.env.env_spacing);
        Self {
            num_envs: n,
            layout: RobotLayout::new(&config.asset),
            tensors: SimTensors::zeros(n, num_bodies, NUM_DOF),
            base_pos: vec![Vec3::ZERO; n],
            base_quat: vec![Quat::IDENTITY; n],
            base_lin_vel: vec![Vec3::ZERO; n],
            base_ang_vel: vec![Vec3::ZERO; n],
            projected_gravity: vec![Vec3::NEG_Z; n],
            projected_forward: vec![Vec3::X; n],
            heading: vec![0.0; n],
            feet: vec![FootKinematics::default(); n],
            commands: vec![[0.0; 4]; n],
            actions: vec![[0.0; NUM_DOF]; n],
            torques: vec![[0.0; NUM_DOF]; n],
            gait_index: vec![0.0; n],
            phases: vec![FootPhases::default(); n],
            last_actions: vec![[0.0; NUM_DOF]; n],
            last_dof_pos: vec![[0.0; NUM_DOF]; n],
            last_dof_vel: vec![[0.0; NUM_DOF]; n],
            last_root_vel: vec![[0.0; 6]; n],
            last_heading: vec![0.0; n],
            init_feet_positions: vec![[Vec3::ZERO; NUM_LEGS]; n],
            episode_length: vec![0; n],
            reset_buf: vec![false; n],
            time_out_buf: vec![false; n],
            power_sum: vec![0.0; n],
            common_step_counter: 0,
            env_origins_new: env_origins.clone(),
            env_origins,
        }
    }

    #[must_use]
    pub fn dof_pos(&self, env: usize) -> [f32; NUM_DOF] {
        let mut out = [0.0; NUM_DOF];
        for (o, d) in out.iter_mut().zip(self.tensors.env_dofs(env)) {
            *o = d.pos;
        }
        out
    }

    #[must_use]
    pub fn dof_vel(&self, env: usize) -> [f32; NUM_DOF] {
        let mut out = [0.0; NUM_DOF];
        for (o, d) in out.iter_mut().zip(self.tensors.env_dofs(env)) {
            *o = d.vel;
        }
        out
    }

    /// Root height above the mean terrain under the rear feet.
    #[must_use]
    pub fn rear_relative_height(&self, env: usize) -> f32 {
        self.tensors.root[env].pos[2] - self.feet[env].rear_terrain()
    }

    #[must_use]
    pub fn contact_force(&self, env: usize, body: usize) -> Vec3 {
        Vec3::from_array(self.tensors.contact_force(env, body))
    }

    /// Recomputes every derived quantity from the refreshed tensors.
    pub fn derive(&mut self, terrain: &Terrain) {
        for env in 0..self.num_envs {
            self.derive_base(env);
            self.derive_feet(env, terrain);
        }
    }

    /// Base pose, body-frame velocities, projections and heading of `env`.
    pub fn derive_base(&mut self, env: usize) {
        let root = self.tensors.root[env];
        let q = root.orientation();
        self.base_pos[env] = root.position();
        self.base_quat[env] = q;
        self.base_lin_vel[env] = quat_rotate_inverse(q, root.linear_velocity());
        self.base_ang_vel[env] = quat_rotate_inverse(q, root.angular_velocity());
        self.projected_gravity[env] = quat_rotate_inverse(q, self.layout.gravity);
        self.projected_forward[env] = quat_rotate_inverse(q, self.layout.forward);
        self.heading[env] = heading_of(q, self.layout.heading_axis);
    }

    fn derive_feet(&mut self, env: usize, terrain: &Terrain) {
        let mut feet = FootKinematics::default();
        for leg in 0..NUM_LEGS {
            let foot = self.tensors.body(env, self.layout.feet[leg]);
            feet.pos[leg] = foot.position();
            feet.vel[leg] = foot.linear_velocity();
            feet.ang_vel[leg] = foot.angular_velocity();
            feet.calf_pos[leg] = self.tensors.body(env, self.layout.calves[leg]).position();
            feet.terrain[leg] = terrain.height_at(feet.pos[leg].x, feet.pos[leg].y);
        }
        self.feet[env] = feet;
    }

    /// Copies the history buffers read by next step's rewards.
    pub fn snapshot_history(&mut self) {
        for env in 0..self.num_envs {
            self.last_actions[env] = self.actions[env];
            self.last_dof_vel[env] = self.dof_vel(env);
            self.last_dof_pos[env] = self.dof_pos(env);
            self.last_root_vel[env] = self.tensors.root[env].velocity6();
            self.last_heading[env] = self.heading[env];
        }
    }

    /// Records foot positions for environments at their first episode step.
    pub fn capture_initial_feet(&mut self) {
        for env in 0..self.num_envs {
            if self.episode_length[env] == 1 {
                self.init_feet_positions[env] = self.feet[env].pos;
            }
        }
    }
}

/// Square grid of spawn origins, `spacing` apart.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn grid_origins(num_envs: usize, spacing: f32) -> Vec<Vec3> {
    let cols = (num_envs as f32).sqrt().ceil().max(1.0) as usize;
    (0..num_envs)
        .map(|i| Vec3::new((i / cols) as f32 * spacing, (i % cols) as f32 * spacing, 0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_origins_are_square() {
        let o = grid_origins(5, 2.0);
        assert_eq!(o.len(), 5);
        assert_eq!(o[1], Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(o[3], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(o[4], Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn derive_projects_gravity_into_body_frame() {
        let cfg = WalkConfig {
            env: crate::config::EnvConfig { num_envs: 1, ..Default::default() },
            ..Default::default()
        };
        let mut state = WalkState::new(&cfg, 17);
        let pitch = Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2);
        state.tensors.root[0].set_orientation(pitch);
        state.derive(&Terrain::Flat);
        // body x now points up, so gravity lies along body -x
        assert!(state.projected_gravity[0].abs_diff_eq(Vec3::NEG_X, 1e-6));
        assert!((state.projected_gravity[0].length() - 1.0).abs() < 1e-6);
        // body -z faces world +x
        assert!(state.heading[0].abs() < 1e-6);
    }
}
