//! # Task Hooks
//!
//! [`LeggedEnv`](crate::env::LeggedEnv) owns the step loop and calls into a
//! [`TaskHooks`] implementation at fixed points of each step and reset. A
//! task decides how commands are drawn, when environments terminate, how
//! robots respawn and what the policy observes.

use fastrand::Rng;

use crate::commands::CommandSampler;
use crate::config::WalkConfig;
use crate::error::EnvError;
use crate::gait::GaitClock;
use crate::observation::{noise_scale_vector, ObservationBuilder};
use crate::rewards::RewardBank;
use crate::state::WalkState;
use crate::termination::{ResetSampler, TerminationRules};

pub trait TaskHooks {
    /// Runs after derived quantities are refreshed and before terminations.
    fn post_physics_step_callback(&mut self, state: &mut WalkState, dt: f32, rng: &mut Rng);

    /// Fills `reset_buf` and `time_out_buf`.
    fn check_termination(&self, state: &mut WalkState);

    /// Rewrites joint and root state of `env_ids` in the host tensors.
    fn reset_robot_states(&self, state: &mut WalkState, env_ids: &[usize], rng: &mut Rng);

    /// Task bookkeeping after the generic reset of `env_ids`.
    fn reset_idx(&mut self, state: &mut WalkState, env_ids: &[usize]);

    fn resample_commands(&self, state: &mut WalkState, env_ids: &[usize], rng: &mut Rng);

    /// Returns whether the command distribution changed.
    fn update_curriculum(&mut self, bank: &RewardBank, env_ids: &[usize]) -> bool;

    /// `num_envs * obs_len()` observations.
    fn compute_observation(&self, state: &WalkState, rng: &mut Rng) -> Vec<f32>;

    /// Noiseless observation recorded alongside actions for diffusion
    /// policies, `num_envs * DIFFUSION_OBS_LEN` values.
    fn diffusion_observation(&self, state: &WalkState) -> Vec<f32>;

    /// # Errors
    /// Fails if the noise layout disagrees with the declared observation length.
    fn noise_scale_vector(&self) -> Result<Vec<f32>, EnvError>;

    fn obs_len(&self) -> usize;

    /// Scalars reported in the episode summary on reset.
    fn episode_extras(&self) -> Vec<(&'static str, f32)> {
        Vec::new()
    }
}

/// The quadruped walk task.
#[derive(Clone, Debug)]
pub struct WalkTask {
    config: WalkConfig,
    sampler: CommandSampler,
    gait: GaitClock,
    observation: ObservationBuilder,
    termination: TerminationRules,
    reset: ResetSampler,
    resample_steps: u32,
}

impl WalkTask {
    /// # Errors
    /// Returns [`EnvError::ObservationLayout`] on an observation length mismatch.
    pub fn new(config: &WalkConfig) -> Result<Self, EnvError> {
        Ok(Self {
            sampler: CommandSampler::new(&config.commands, config.env.vel_cmd),
            gait: GaitClock::new(&config.gait),
            observation: ObservationBuilder::new(config)?,
            termination: TerminationRules::new(config),
            reset: ResetSampler::new(config),
            resample_steps: config.resample_steps(),
            config: config.clone(),
        })
    }

    #[must_use]
    pub fn sampler(&self) -> &CommandSampler {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut CommandSampler {
        &mut self.sampler
    }
}

impl TaskHooks for WalkTask {
    fn post_physics_step_callback(&mut self, state: &mut WalkState, dt: f32, rng: &mut Rng) {
        let due: Vec<usize> = (0..state.num_envs)
            .filter(|&env| state.episode_length[env] % self.resample_steps == 0)
            .collect();
        if !due.is_empty() {
            self.resample_commands(state, &due, rng);
        }
        if self.sampler.heading_command() {
            self.sampler.recompute_ang_vel(&mut state.commands, &state.heading);
        }
        for env in 0..state.num_envs {
            state.gait_index[env] = self.gait.advance(state.gait_index[env], dt);
            state.phases[env] = self.gait.phases(state.gait_index[env]);
        }
    }

    fn check_termination(&self, state: &mut WalkState) {
        self.termination.check(state);
    }

    fn reset_robot_states(&self, state: &mut WalkState, env_ids: &[usize], rng: &mut Rng) {
        self.reset.reset_dofs(state, env_ids, rng);
        self.reset.reset_root(state, env_ids, rng);
    }

    fn reset_idx(&mut self, state: &mut WalkState, env_ids: &[usize]) {
        for &env in env_ids {
            state.derive_base(env);
            state.last_heading[env] = state.heading[env];
        }
    }

    fn resample_commands(&self, state: &mut WalkState, env_ids: &[usize], rng: &mut Rng) {
        self.sampler.resample(&mut state.commands, env_ids, rng);
    }

    fn update_curriculum(&mut self, bank: &RewardBank, env_ids: &[usize]) -> bool {
        self.sampler
            .update_curriculum(bank, self.termination.max_episode_length, env_ids)
    }

    fn compute_observation(&self, state: &WalkState, rng: &mut Rng) -> Vec<f32> {
        self.observation.build(state, rng)
    }

    fn diffusion_observation(&self, state: &WalkState) -> Vec<f32> {
        self.observation.build_diffusion(state)
    }

    fn noise_scale_vector(&self) -> Result<Vec<f32>, EnvError> {
        let c = &self.config;
        noise_scale_vector(
            &c.noise,
            &c.normalization.obs_scales,
            c.env.obs_t,
            c.env.num_single_state,
        )
    }

    fn obs_len(&self) -> usize {
        self.observation.len()
    }

    fn episode_extras(&self) -> Vec<(&'static str, f32)> {
        if self.config.commands.curriculum {
            vec![("max_command_x", self.sampler.ranges.lin_vel_x[1])]
        } else {
            Vec::new()
        }
    }
}
