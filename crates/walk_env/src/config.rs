//! # Walk Task Configuration
//!
//! Every section is `#[serde(default)]`, so a JSON document only needs the
//! values it overrides:
//!
//! ```json
//! { "env": { "num_envs": 64 }, "rewards": { "scales": { "lift_up": 1.0 } } }
//! ```

use std::collections::BTreeMap;
use std::f32::consts::PI;
use std::path::Path;

use serde::Deserialize;

use crate::error::EnvError;
use crate::terrain::Terrain;
use crate::NUM_DOF;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Train,
    Test,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    pub mode: Mode,
    pub seed: u64,
    pub env: EnvConfig,
    pub sim: SimConfig,
    pub control: ControlConfig,
    pub commands: CommandsConfig,
    pub rewards: RewardsConfig,
    pub noise: NoiseConfig,
    pub normalization: NormalizationConfig,
    pub init_state: InitStateConfig,
    pub gait: GaitConfig,
    pub asset: AssetConfig,
    pub terrain: Terrain,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub num_envs: usize,
    /// Declared observation length; must match the builder's layout.
    pub num_single_state: usize,
    pub episode_length_s: f32,
    /// Append normalised episode progress to the observation.
    pub obs_t: bool,
    /// When false, linear and heading commands are held at zero.
    pub vel_cmd: bool,
    /// Terminate on contact of termination bodies. Off in the walk task.
    pub contact_termination: bool,
    /// Spawn around per-env origins on a grid of `env_spacing`.
    pub custom_origins: bool,
    pub env_spacing: f32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            num_envs: 4096,
            num_single_state: 47,
            episode_length_s: 20.0,
            obs_t: false,
            vel_cmd: true,
            contact_termination: false,
            custom_origins: false,
            env_spacing: 3.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Physics sub-step in seconds.
    pub dt: f32,
    /// Physics sub-steps per control step.
    pub decimation: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { dt: 0.005, decimation: 4 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub action_scale: f32,
    pub torque_limit: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            stiffness: 20.0,
            damping: 0.5,
            action_scale: 0.25,
            torque_limit: 12.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CommandRangesConfig {
    pub lin_vel_x: [f32; 2],
    pub lin_vel_y: [f32; 2],
    pub ang_vel_yaw: [f32; 2],
    pub heading: [f32; 2],
}

impl Default for CommandRangesConfig {
    fn default() -> Self {
        Self {
            lin_vel_x: [-0.3, 0.3],
            lin_vel_y: [0.0, 0.0],
            ang_vel_yaw: [0.0, 0.0],
            heading: [-PI, PI],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub curriculum: bool,
    pub max_curriculum: f32,
    /// Seconds between command resamples.
    pub resampling_time: f32,
    /// Sample a heading target and derive the yaw rate from it.
    pub heading_command: bool,
    /// Round the x-velocity command to multiples of 0.1.
    pub discretize: bool,
    pub clip_ang_vel: f32,
    pub ranges: CommandRangesConfig,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            curriculum: false,
            max_curriculum: 1.0,
            resampling_time: 10.0,
            heading_command: true,
            discretize: true,
            clip_ang_vel: 1.0,
            ranges: CommandRangesConfig::default(),
        }
    }
}

/// How `tracking_ang_vel` measures its error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngRewardMode {
    #[default]
    Heading,
    HeadingWithPen,
    AngVel,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// Per-term scales; zero entries are dropped when the bank is built.
    pub scales: BTreeMap<String, f32>,
    pub only_positive_rewards: bool,
    pub tracking_sigma: f32,
    pub tracking_ang_sigma: f32,
    pub tracking_liftup_sigma: f32,
    pub liftup_target: f32,
    pub lift_up_threshold: [f32; 2],
    pub scale_factor_low: f32,
    pub scale_factor_high: f32,
    pub foot_target: f32,
    /// Settling window after reset, in control steps.
    pub allow_contact_steps: u32,
    pub ang_rew_mode: AngRewardMode,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        let scales = [
            ("lift_up_linear", 0.8),
            ("tracking_lin_vel", 1.0),
            ("tracking_ang_vel", 0.5),
            ("feet_clearance_cmd_linear", -30.0),
            ("rear_air", -0.5),
            ("stand_air", -0.5),
            ("foot_twist", -0.1),
            ("feet_slip", -0.04),
            ("foot_shift", -0.5),
            ("front_contact_force", -0.01),
            ("hip_still", -0.1),
            ("action_rate", -0.03),
            ("dof_acc", -2.5e-7),
            ("torques", -1e-5),
            ("evaluate_metrics", 1.0),
        ]
        .into_iter()
        .map(|(name, scale)| (name.to_string(), scale))
        .collect();
        Self {
            scales,
            only_positive_rewards: false,
            tracking_sigma: 0.25,
            tracking_ang_sigma: 0.25,
            tracking_liftup_sigma: 0.03,
            liftup_target: 0.42,
            lift_up_threshold: [0.15, 0.42],
            scale_factor_low: 0.25,
            scale_factor_high: 0.35,
            foot_target: 0.05,
            allow_contact_steps: 30,
            ang_rew_mode: AngRewardMode::Heading,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NoiseScales {
    pub gravity: f32,
    pub dof_pos: f32,
    pub dof_vel: f32,
}

impl Default for NoiseScales {
    fn default() -> Self {
        Self { gravity: 0.05, dof_pos: 0.01, dof_vel: 1.5 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub add_noise: bool,
    pub noise_level: f32,
    pub noise_scales: NoiseScales,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            add_noise: true,
            noise_level: 1.0,
            noise_scales: NoiseScales::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ObsScales {
    pub lin_vel: f32,
    pub ang_vel: f32,
    pub dof_pos: f32,
    pub dof_vel: f32,
}

impl Default for ObsScales {
    fn default() -> Self {
        Self { lin_vel: 2.0, ang_vel: 0.25, dof_pos: 1.0, dof_vel: 0.05 }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub obs_scales: ObsScales,
    pub clip_observations: f32,
    pub clip_actions: f32,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            obs_scales: ObsScales::default(),
            clip_observations: 100.0,
            clip_actions: 100.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct InitStateConfig {
    pub pos: [f32; 3],
    /// Base orientation, `xyzw`.
    pub rot: [f32; 4],
    pub lin_vel: [f32; 3],
    pub ang_vel: [f32; 3],
    /// Joint order: (hip, thigh, calf) for FL, FR, RL, RR.
    pub default_joint_angles: [f32; NUM_DOF],
    /// Reset joint positions are drawn in `[lo, hi] x default pose`.
    pub dof_pos_scale_range: [f32; 2],
    pub dof_vel_range: f32,
    pub root_vel_range: f32,
    pub randomize_rot: bool,
    pub rot_noise_deg: f32,
    /// Lateral spawn jitter around custom origins in train mode.
    pub lateral_spawn_range: f32,
}

impl Default for InitStateConfig {
    fn default() -> Self {
        Self {
            pos: [0.0, 0.0, 0.3],
            rot: [0.0, 0.0, 0.0, 1.0],
            lin_vel: [0.0; 3],
            ang_vel: [0.0; 3],
            default_joint_angles: [
                0.1, 0.8, -1.5, -0.1, 0.8, -1.5, 0.1, 1.0, -1.5, -0.1, 1.0, -1.5,
            ],
            dof_pos_scale_range: [0.5, 1.5],
            dof_vel_range: 0.1,
            root_vel_range: 0.1,
            randomize_rot: false,
            rot_noise_deg: 15.0,
            lateral_spawn_range: 2.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Stride frequency in Hz.
    pub frequency: f32,
    /// Per-foot phase offsets in `[0, 1)`.
    pub offsets: [f32; 4],
    /// Fraction of the cycle spent in stance.
    pub duration: f32,
    /// Width of the smoothed contact window.
    pub kappa: f32,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            offsets: [0.0, 0.5, 0.0, 0.5],
            duration: 0.5,
            kappa: 0.07,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Rigid-body indices of FL, FR, RL, RR feet.
    pub feet_indices: [usize; 4],
    /// Rigid-body indices of FL, FR, RL, RR calves.
    pub calf_indices: [usize; 4],
    /// Bodies whose contact ends an episode when contact termination is on;
    /// entries 5 and 6 are the front calves used by `front_contact_force`.
    pub termination_contact_indices: Vec<usize>,
    /// Body axis that points forward when the robot stands up.
    pub forward_vec: [f32; 3],
    /// Reference axis for the standing test, in the yaw frame.
    pub upright_vec: [f32; 3],
    /// Body axis whose planar direction defines the heading.
    pub heading_vec: [f32; 3],
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            feet_indices: [4, 8, 12, 16],
            calf_indices: [3, 7, 11, 15],
            termination_contact_indices: vec![0, 1, 5, 9, 13, 3, 7, 2, 6, 10, 14],
            forward_vec: [1.0, 0.0, 0.0],
            upright_vec: [0.2, 0.0, 1.0],
            heading_vec: [0.0, 0.0, -1.0],
        }
    }
}

impl WalkConfig {
    /// # Errors
    /// Fails on malformed JSON or a configuration rejected by [`Self::validate`].
    pub fn from_json(json: &str) -> Result<Self, EnvError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Fails when the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Control step in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn control_dt(&self) -> f32 {
        self.sim.dt * self.sim.decimation as f32
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn max_episode_length(&self) -> u32 {
        (self.env.episode_length_s / self.control_dt()).ceil() as u32
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resample_steps(&self) -> u32 {
        ((self.commands.resampling_time / self.control_dt()).round() as u32).max(1)
    }

    /// # Errors
    /// Returns [`EnvError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<(), EnvError> {
        let bad = |msg: &str| Err(EnvError::InvalidConfig(msg.to_string()));
        if self.env.num_envs == 0 {
            return bad("env.num_envs must be positive");
        }
        if self.sim.dt <= 0.0 || self.sim.decimation == 0 {
            return bad("sim.dt and sim.decimation must be positive");
        }
        if self.env.episode_length_s <= 0.0 {
            return bad("env.episode_length_s must be positive");
        }
        if self.commands.clip_ang_vel <= 0.0 {
            return bad("commands.clip_ang_vel must be positive");
        }
        let [t0, t1] = self.rewards.lift_up_threshold;
        if t1 <= t0 {
            return bad("rewards.lift_up_threshold must be increasing");
        }
        if self.rewards.scale_factor_high <= self.rewards.scale_factor_low {
            return bad("rewards.scale_factor_high must exceed scale_factor_low");
        }
        if self.rewards.allow_contact_steps == 0 {
            return bad("rewards.allow_contact_steps must be positive");
        }
        if self.gait.duration <= 0.0 || self.gait.duration >= 1.0 {
            return bad("gait.duration must lie in (0, 1)");
        }
        self.terrain.validate()
    }

    /// Checks body indices against the simulator's body count.
    ///
    /// # Errors
    /// Returns [`EnvError::InvalidConfig`] for an out-of-range index.
    pub fn validate_bodies(&self, num_bodies: usize) -> Result<(), EnvError> {
        let asset = &self.asset;
        let out_of_range = asset
            .feet_indices
            .iter()
            .chain(&asset.calf_indices)
            .chain(&asset.termination_contact_indices)
            .find(|&&b| b >= num_bodies);
        match out_of_range {
            Some(b) => Err(EnvError::InvalidConfig(format!(
                "body index {b} out of range for {num_bodies} bodies"
            ))),
            None => Ok(()),
        }
    }
}
