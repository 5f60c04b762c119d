//! # Observation Builder
//!
//! One flat row per environment:
//!
//! | slots  | content                                   |
//! |--------|-------------------------------------------|
//! | 0..3   | projected gravity                         |
//! | 3..6   | projected forward axis                    |
//! | 6..9   | `[cmd_y, cmd_x, 0]`, linear-velocity scaled |
//! | 9..21  | joint offsets from the default pose       |
//! | 21..33 | joint velocities                          |
//! | 33..45 | actions                                   |
//! | 45..47 | rear-foot gait clock                      |
//! | 47     | settling progress (optional)              |
//!
//! The diffusion observation used for demonstration recording shares the
//! first 45 slots, with its own command remap and no clock, noise or
//! clipping.

use fastrand::Rng;

use crate::config::{NoiseConfig, ObsScales, WalkConfig};
use crate::error::EnvError;
use crate::state::WalkState;
use crate::NUM_DOF;

const GRAVITY: usize = 0;
const FORWARD: usize = 3;
const COMMANDS: usize = 6;
const DOF_POS: usize = 9;
const DOF_VEL: usize = DOF_POS + NUM_DOF;
const ACTIONS: usize = DOF_VEL + NUM_DOF;
const CLOCK: usize = ACTIONS + NUM_DOF;
/// Length of the layout without the time slot.
pub const BASE_OBS_LEN: usize = CLOCK + 2;
/// Length of the diffusion observation.
pub const DIFFUSION_OBS_LEN: usize = CLOCK;

/// Observation length implied by the layout.
#[must_use]
pub fn layout_len(obs_t: bool) -> usize {
    BASE_OBS_LEN + usize::from(obs_t)
}

/// Per-slot uniform noise amplitudes.
///
/// # Errors
/// Returns [`EnvError::ObservationLayout`] if the layout does not match the
/// declared observation length.
pub fn noise_scale_vector(
    noise: &NoiseConfig,
    scales: &ObsScales,
    obs_t: bool,
    declared: usize,
) -> Result<Vec<f32>, EnvError> {
    let layout = layout_len(obs_t);
    if layout != declared {
        return Err(EnvError::ObservationLayout { layout, declared });
    }
    let level = noise.noise_level;
    let s = &noise.noise_scales;
    let mut vec = vec![0.0; layout];
    vec[GRAVITY..COMMANDS].fill(s.gravity * level);
    vec[DOF_POS..DOF_VEL].fill(s.dof_pos * level * scales.dof_pos);
    vec[DOF_VEL..ACTIONS].fill(s.dof_vel * level * scales.dof_vel);
    Ok(vec)
}

#[derive(Clone, Debug)]
pub struct ObservationBuilder {
    scales: ObsScales,
    default_dof_pos: [f32; NUM_DOF],
    obs_t: bool,
    allow_contact_steps: u32,
    clip: f32,
    noise: Option<Vec<f32>>,
    len: usize,
}

impl ObservationBuilder {
    /// # Errors
    /// Fails when the layout length differs from `env.num_single_state`.
    pub fn new(config: &WalkConfig) -> Result<Self, EnvError> {
        let scales = config.normalization.obs_scales.clone();
        let noise_vec = noise_scale_vector(
            &config.noise,
            &scales,
            config.env.obs_t,
            config.env.num_single_state,
        )?;
        Ok(Self {
            scales,
            default_dof_pos: config.init_state.default_joint_angles,
            obs_t: config.env.obs_t,
            allow_contact_steps: config.rewards.allow_contact_steps,
            clip: config.normalization.clip_observations,
            noise: config.noise.add_noise.then_some(noise_vec),
            len: config.env.num_single_state,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writes the noiseless observation of `env` into `out`.
    pub fn write(&self, state: &WalkState, env: usize, out: &mut [f32]) {
        let cmd = state.commands[env];
        self.write_common(state, env, [cmd[1], cmd[0], 0.0], out);
        out[CLOCK..BASE_OBS_LEN].copy_from_slice(&state.phases[env].clock_inputs[2..4]);

        if self.obs_t {
            #[allow(clippy::cast_precision_loss)]
            let progress = state.episode_length[env] as f32 / self.allow_contact_steps.max(1) as f32;
            out[BASE_OBS_LEN] = progress.clamp(0.0, 1.0);
        }
    }

    /// Writes the [`DIFFUSION_OBS_LEN`] diffusion observation of `env`.
    ///
    /// Commands are remapped on a copy: a non-zero lateral command replaces
    /// the forward one, the lateral slot is pinned to `-1` and the yaw slot
    /// to zero.
    pub fn write_diffusion(&self, state: &WalkState, env: usize, out: &mut [f32]) {
        let mut cmd = state.commands[env];
        if cmd[1] != 0.0 {
            cmd[0] = cmd[1];
        }
        self.write_common(state, env, [cmd[0], -1.0, 0.0], out);
    }

    /// Diffusion observations of every environment, `num_envs * 45` values.
    #[must_use]
    pub fn build_diffusion(&self, state: &WalkState) -> Vec<f32> {
        let mut obs = vec![0.0; state.num_envs * DIFFUSION_OBS_LEN];
        for (env, row) in obs.chunks_exact_mut(DIFFUSION_OBS_LEN).enumerate() {
            self.write_diffusion(state, env, row);
        }
        obs
    }

    /// Slots `0..45`: projections, scaled `commands`, joint state and actions.
    fn write_common(&self, state: &WalkState, env: usize, commands: [f32; 3], out: &mut [f32]) {
        let s = &self.scales;
        out[GRAVITY..FORWARD].copy_from_slice(&state.projected_gravity[env].to_array());
        out[FORWARD..COMMANDS].copy_from_slice(&state.projected_forward[env].to_array());
        out[COMMANDS..DOF_POS].copy_from_slice(&[
            commands[0] * s.lin_vel,
            commands[1] * s.lin_vel,
            commands[2] * s.ang_vel,
        ]);
        for (j, d) in state.tensors.env_dofs(env).iter().enumerate() {
            out[DOF_POS + j] = (d.pos - self.default_dof_pos[j]) * s.dof_pos;
            out[DOF_VEL + j] = d.vel * s.dof_vel;
        }
        out[ACTIONS..CLOCK].copy_from_slice(&state.actions[env]);
    }

    /// Observations of every environment as one `num_envs * len` buffer,
    /// with noise and clipping applied.
    pub fn build(&self, state: &WalkState, rng: &mut Rng) -> Vec<f32> {
        let mut obs = vec![0.0; state.num_envs * self.len];
        for (env, row) in obs.chunks_exact_mut(self.len).enumerate() {
            self.write(state, env, row);
            if let Some(noise) = &self.noise {
                for (o, n) in row.iter_mut().zip(noise) {
                    *o += (2.0 * rng.f32() - 1.0) * n;
                }
            }
            for o in row.iter_mut() {
                *o = o.clamp(-self.clip, self.clip);
            }
        }
        obs
    }
}
