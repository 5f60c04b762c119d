//! # Termination and Reset
//!
//! Termination marks environments for reset. The reset samplers rewrite the
//! joint and root state of selected environments in the host tensors; the
//! caller commits them to the simulator with indexed writes.

use fastrand::Rng;
use glam::Vec3;
use physics::RootState;

use crate::commands::uniform;
use crate::config::{InitStateConfig, Mode, WalkConfig};
use crate::math::{euler_xyz, quat_from_euler_xyz};
use crate::state::WalkState;
use crate::NUM_DOF;

/// Contact force magnitude counted as a collision.
const CONTACT_THRESHOLD: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
pub struct TerminationRules {
    pub contact_termination: bool,
    pub max_episode_length: u32,
}

impl TerminationRules {
    #[must_use]
    pub fn new(config: &WalkConfig) -> Self {
        Self {
            contact_termination: config.env.contact_termination,
            max_episode_length: config.max_episode_length(),
        }
    }

    /// Fills `reset_buf` and `time_out_buf` for every environment.
    pub fn check(&self, state: &mut WalkState) {
        for env in 0..state.num_envs {
            let collided = self.contact_termination
                && state
                    .layout
                    .termination_contacts
                    .iter()
                    .any(|&b| state.contact_force(env, b).length() > CONTACT_THRESHOLD);
            let timed_out = state.episode_length[env] > self.max_episode_length;
            state.time_out_buf[env] = timed_out;
            state.reset_buf[env] = collided || timed_out;
        }
    }
}

/// Samples initial joint and root states for resetting environments.
#[derive(Clone, Debug)]
pub struct ResetSampler {
    dof_pos_range: [[f32; 2]; NUM_DOF],
    dof_vel_range: f32,
    root_vel_range: f32,
    base_init: RootState,
    custom_origins: bool,
    lateral_jitter: Option<f32>,
    rot_noise: Option<f32>,
}

impl ResetSampler {
    #[must_use]
    pub fn new(config: &WalkConfig) -> Self {
        let init = &config.init_state;
        Self {
            dof_pos_range: dof_pos_range(init),
            dof_vel_range: init.dof_vel_range,
            root_vel_range: init.root_vel_range,
            base_init: RootState {
                pos: init.pos,
                rot: init.rot,
                lin_vel: init.lin_vel,
                ang_vel: init.ang_vel,
            },
            custom_origins: config.env.custom_origins,
            lateral_jitter: (config.mode == Mode::Train).then_some(init.lateral_spawn_range),
            rot_noise: init.randomize_rot.then_some(init.rot_noise_deg.to_radians()),
        }
    }

    pub fn reset_dofs(&self, state: &mut WalkState, env_ids: &[usize], rng: &mut Rng) {
        for &env in env_ids {
            for (dof, [lo, hi]) in state.tensors.env_dofs_mut(env).iter_mut().zip(self.dof_pos_range) {
                dof.pos = lo + rng.f32() * (hi - lo);
                dof.vel = uniform(rng, [-self.dof_vel_range, self.dof_vel_range]);
            }
        }
    }

    pub fn reset_root(&self, state: &mut WalkState, env_ids: &[usize], rng: &mut Rng) {
        let v = self.root_vel_range;
        for &env in env_ids {
            let mut root = self.base_init;
            let mut pos = root.position() + state.env_origins[env];
            if self.custom_origins {
                if let Some(range) = self.lateral_jitter {
                    pos.y += uniform(rng, [-range, range]);
                }
                state.env_origins_new[env] = pos;
            }
            root.set_position(pos);

            if let Some(noise) = self.rot_noise {
                let jitter = Vec3::new(
                    uniform(rng, [-noise, noise]),
                    uniform(rng, [-noise, noise]),
                    uniform(rng, [-noise, noise]),
                );
                let rpy = jitter + euler_xyz(self.base_init.orientation());
                root.set_orientation(quat_from_euler_xyz(rpy));
            }

            root.lin_vel = [(); 3].map(|()| uniform(rng, [-v, v]));
            root.ang_vel = [(); 3].map(|()| uniform(rng, [-v, v]));
            state.tensors.root[env] = root;
        }
    }
}

/// Per-joint reset range: the default pose scaled by both ends of the scale
/// range, ordered low to high.
fn dof_pos_range(init: &InitStateConfig) -> [[f32; 2]; NUM_DOF] {
    let [s0, s1] = init.dof_pos_scale_range;
    init.default_joint_angles.map(|q| {
        let (a, b) = (q * s0, q * s1);
        [a.min(b), a.max(b)]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(n: usize) -> WalkConfig {
        let mut cfg = WalkConfig::default();
        cfg.env.num_envs = n;
        cfg
    }

    #[test]
    fn timeout_needs_strictly_longer_episode() {
        let cfg = config(2);
        let rules = TerminationRules::new(&cfg);
        let mut state = WalkState::new(&cfg, 17);
        state.episode_length = vec![rules.max_episode_length, rules.max_episode_length + 1];
        rules.check(&mut state);
        assert_eq!(state.reset_buf, vec![false, true]);
        assert_eq!(state.time_out_buf, vec![false, true]);
    }

    #[test]
    fn contact_termination_is_off_by_default() {
        let mut cfg = config(1);
        let mut state = WalkState::new(&cfg, 17);
        let base = state.layout.termination_contacts[0];
        state.tensors.contact_forces[base] = [0.0, 0.0, 50.0];
        TerminationRules::new(&cfg).check(&mut state);
        assert!(!state.reset_buf[0]);

        cfg.env.contact_termination = true;
        TerminationRules::new(&cfg).check(&mut state);
        assert!(state.reset_buf[0]);
        assert!(!state.time_out_buf[0]);
    }

    #[test]
    fn dof_ranges_are_ordered_for_negative_joints() {
        let ranges = dof_pos_range(&InitStateConfig::default());
        // calf default -1.5 scaled by [0.5, 1.5]
        assert!((ranges[2][0] + 2.25).abs() < 1e-6);
        assert!((ranges[2][1] + 0.75).abs() < 1e-6);
        assert!(ranges.iter().all(|[lo, hi]| lo <= hi));
    }

    #[test]
    fn reset_writes_only_selected_envs() {
        let cfg = config(3);
        let sampler = ResetSampler::new(&cfg);
        let mut state = WalkState::new(&cfg, 17);
        let mut rng = Rng::with_seed(11);
        sampler.reset_dofs(&mut state, &[1], &mut rng);
        sampler.reset_root(&mut state, &[1], &mut rng);

        assert!(state.tensors.env_dofs(0).iter().all(|d| d.pos == 0.0 && d.vel == 0.0));
        assert_eq!(state.tensors.root[2], RootState::default());
        let root = state.tensors.root[1];
        let expected = Vec3::from_array(cfg.init_state.pos) + state.env_origins[1];
        assert!(root.position().abs_diff_eq(expected, 1e-6));
        assert!(root.lin_vel.iter().chain(&root.ang_vel).all(|v| v.abs() <= 0.1));
        for (d, [lo, hi]) in state.tensors.env_dofs(1).iter().zip(dof_pos_range(&cfg.init_state)) {
            assert!(d.pos >= lo - 1e-6 && d.pos <= hi + 1e-6);
        }
    }

    #[test]
    fn randomized_rotation_stays_within_noise() {
        let mut cfg = config(1);
        cfg.init_state.randomize_rot = true;
        let sampler = ResetSampler::new(&cfg);
        let mut state = WalkState::new(&cfg, 17);
        sampler.reset_root(&mut state, &[0], &mut Rng::with_seed(2));
        let rpy = euler_xyz(state.tensors.root[0].orientation());
        let limit = 15f32.to_radians() + 1e-4;
        assert!(rpy.x.abs() <= limit && rpy.y.abs() <= limit && rpy.z.abs() <= limit);
    }

    #[test]
    fn custom_origins_record_spawn_position() {
        let mut cfg = config(2);
        cfg.env.custom_origins = true;
        let sampler = ResetSampler::new(&cfg);
        let mut state = WalkState::new(&cfg, 17);
        sampler.reset_root(&mut state, &[1], &mut Rng::with_seed(9));
        let spawn = state.tensors.root[1].position();
        assert_eq!(state.env_origins_new[1], spawn);
        assert!((spawn.y - state.env_origins[1].y).abs() <= 2.0);
    }
}
