//! # Command Sampler and Curriculum
//!
//! Commands are `[lin_vel_x, lin_vel_y, ang_vel, heading]` per environment.
//! The sampler owns the live sampling ranges; the curriculum widens them in
//! place once the policy tracks the current ones well enough.

use std::f32::consts::FRAC_PI_2;

use fastrand::Rng;
use tracing::info;

use crate::config::CommandsConfig;
use crate::math::wrap_to_pi;
use crate::rewards::RewardBank;

/// Curriculum widening step applied to each bound.
const CURRICULUM_STEP: f32 = 0.2;
/// Fraction of the term scale the mean episode reward must exceed.
const CURRICULUM_THRESHOLD: f32 = 0.8;
const DISCRETE_STEP: f32 = 0.1;

#[derive(Clone, Debug, PartialEq)]
pub struct CommandRanges {
    pub lin_vel_x: [f32; 2],
    pub lin_vel_y: [f32; 2],
    pub ang_vel_yaw: [f32; 2],
    pub heading: [f32; 2],
}

#[derive(Clone, Debug)]
pub struct CommandSampler {
    pub ranges: CommandRanges,
    max_curriculum: f32,
    heading_command: bool,
    discretize: bool,
    vel_cmd: bool,
    clip_ang_vel: f32,
}

pub(crate) fn uniform(rng: &mut Rng, [lo, hi]: [f32; 2]) -> f32 {
    lo + (hi - lo) * rng.f32()
}

/// Rounds to the nearest multiple of 0.1, keeping the sign of `x`.
#[must_use]
pub fn discretize_velocity(x: f32) -> f32 {
    let sign = if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    };
    sign * (x.abs() / DISCRETE_STEP).round() * DISCRETE_STEP
}

fn widen(range: &mut [f32; 2], max: f32) {
    range[0] = (range[0] - CURRICULUM_STEP).clamp(-max, 0.0);
    range[1] = (range[1] + CURRICULUM_STEP).clamp(0.0, max);
}

impl CommandSampler {
    #[must_use]
    pub fn new(config: &CommandsConfig, vel_cmd: bool) -> Self {
        let r = &config.ranges;
        Self {
            ranges: CommandRanges {
                lin_vel_x: r.lin_vel_x,
                lin_vel_y: r.lin_vel_y,
                ang_vel_yaw: r.ang_vel_yaw,
                heading: r.heading,
            },
            max_curriculum: config.max_curriculum,
            heading_command: config.heading_command,
            discretize: config.discretize,
            vel_cmd,
            clip_ang_vel: config.clip_ang_vel,
        }
    }

    #[must_use]
    pub fn heading_command(&self) -> bool {
        self.heading_command
    }

    /// Draws fresh commands for `env_ids` from the current ranges.
    pub fn resample(&self, commands: &mut [[f32; 4]], env_ids: &[usize], rng: &mut Rng) {
        for &env in env_ids {
            let cmd = &mut commands[env];
            cmd[0] = uniform(rng, self.ranges.lin_vel_x);
            cmd[1] = uniform(rng, self.ranges.lin_vel_y);
            if self.heading_command {
                cmd[3] = uniform(rng, self.ranges.heading);
            } else {
                cmd[2] = uniform(rng, self.ranges.ang_vel_yaw);
            }
            if self.discretize {
                cmd[0] = discretize_velocity(cmd[0]);
            }
            if !self.vel_cmd {
                cmd[0] = 0.0;
                cmd[1] = 0.0;
                cmd[3] = 0.0;
            }
        }
    }

    /// Widens the ranges of well-tracked commands. Terms missing from the
    /// bank are skipped. Returns whether any range changed.
    pub fn update_curriculum(
        &mut self,
        bank: &RewardBank,
        max_episode_length: u32,
        env_ids: &[usize],
    ) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let max_len = max_episode_length as f32;
        let tracked = |term: &str| match (bank.mean_episode_sum(term, env_ids), bank.scale(term)) {
            (Some(mean), Some(scale)) => mean / max_len > CURRICULUM_THRESHOLD * scale,
            _ => false,
        };

        let mut widened = false;
        if tracked("tracking_lin_vel") {
            widen(&mut self.ranges.lin_vel_x, self.max_curriculum);
            widen(&mut self.ranges.lin_vel_y, self.max_curriculum);
            widened = true;
        }
        if tracked("tracking_ang_vel") {
            widen(&mut self.ranges.ang_vel_yaw, self.max_curriculum);
            widened = true;
        }
        if widened {
            info!(
                lin_vel_x = ?self.ranges.lin_vel_x,
                lin_vel_y = ?self.ranges.lin_vel_y,
                ang_vel_yaw = ?self.ranges.ang_vel_yaw,
                "command curriculum widened"
            );
        }
        widened
    }

    /// Derives the yaw-rate command from the heading error, saturating at
    /// `clip_ang_vel` and rescaled so saturation maps to `pi / 2`.
    pub fn recompute_ang_vel(&self, commands: &mut [[f32; 4]], heading: &[f32]) {
        let c = self.clip_ang_vel;
        for (cmd, &h) in commands.iter_mut().zip(heading) {
            cmd[2] = (0.5 * wrap_to_pi(cmd[3] - h)).clamp(-c, c) * (FRAC_PI_2 / c);
        }
    }
}
