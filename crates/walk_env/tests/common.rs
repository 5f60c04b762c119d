#![allow(dead_code)]

use glam::Quat;
use physics::{MockSim, MockSimConfig};
use walk_env::{LeggedEnv, WalkConfig, WalkState, WalkTask};

/// Default configuration shrunk to `num_envs` environments without
/// observation noise.
pub fn config(num_envs: usize) -> WalkConfig {
    let mut cfg = WalkConfig::default();
    cfg.env.num_envs = num_envs;
    cfg.noise.add_noise = false;
    cfg
}

pub fn mock_env(cfg: WalkConfig) -> LeggedEnv<MockSim, WalkTask> {
    let sim = MockSim::new(MockSimConfig {
        num_envs: cfg.env.num_envs,
        ..MockSimConfig::default()
    });
    let task = WalkTask::new(&cfg).unwrap();
    LeggedEnv::new(sim, task, cfg).unwrap()
}

/// Robot reared up on its hind legs: body x points straight up.
pub fn standing() -> Quat {
    Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2)
}

/// Host-side state for exercising reward terms directly.
pub fn state(cfg: &WalkConfig) -> WalkState {
    WalkState::new(cfg, MockSimConfig::default().body_offsets.len())
}
