//! Evaluation metrics reported alongside rewards.

use super::RewardContext;
use crate::math::wrap_to_pi;

/// Per-environment metrics for one step. Every value is zero for
/// environments still inside the settling window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EpisodeMetrics {
    /// Absolute heading error in radians.
    pub tracking_ang_vel: Vec<f32>,
    /// Mechanical work accumulated since the previous evaluation.
    pub energy: Vec<f32>,
    /// Absolute body-frame yaw rate.
    pub base_ang_vel: Vec<f32>,
    /// Control time counted towards the metrics.
    pub time: Vec<f32>,
}

impl EpisodeMetrics {
    #[must_use]
    pub fn evaluate(ctx: &RewardContext<'_>) -> Self {
        let state = ctx.state;
        let n = state.num_envs;
        let mut out = Self {
            tracking_ang_vel: vec![0.0; n],
            energy: vec![0.0; n],
            base_ang_vel: vec![0.0; n],
            time: vec![0.0; n],
        };
        for env in 0..n {
            if state.episode_length[env] <= ctx.cfg.allow_contact_steps {
                continue;
            }
            out.tracking_ang_vel[env] = wrap_to_pi(state.commands[env][3] - state.heading[env]).abs();
            out.energy[env] = state.power_sum[env];
            out.base_ang_vel[env] = state.base_ang_vel[env].z.abs();
            out.time[env] = ctx.dt;
        }
        out
    }

    /// Mean of each metric over `env_ids`, keyed by metric name.
    #[must_use]
    pub fn means(&self, env_ids: &[usize]) -> [(&'static str, f32); 4] {
        let mean = |v: &[f32]| {
            if env_ids.is_empty() {
                return 0.0;
            }
            #[allow(clippy::cast_precision_loss)]
            let m = env_ids.iter().map(|&e| v[e]).sum::<f32>() / env_ids.len() as f32;
            m
        };
        [
            ("tracking_ang_vel", mean(&self.tracking_ang_vel)),
            ("energy", mean(&self.energy)),
            ("base_ang_vel", mean(&self.base_ang_vel)),
            ("time", mean(&self.time)),
        ]
    }
}
