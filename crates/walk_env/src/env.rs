//! # Step Orchestrator
//!
//! [`LeggedEnv`] drives a batched simulator through one control step:
//!
//! 1.  PD torques from the clipped actions, applied for `decimation`
//!     physics sub-steps while the mechanical power is accumulated.
//! 2.  A full state refresh and the post-physics pipeline: episode
//!     counters, derived quantities, the task callback, terminations,
//!     rewards, resets, observations, and finally the history snapshot.
//!
//! Every buffer is batched over environments and no environment reads
//! another's state.

use std::collections::BTreeMap;

use fastrand::Rng;
use physics::SimBackend;
use tracing::{debug, info};

use crate::config::{ControlConfig, WalkConfig};
use crate::error::EnvError;
use crate::rewards::{EpisodeMetrics, RewardBank};
use crate::state::WalkState;
use crate::task::TaskHooks;
use crate::terrain::Terrain;
use crate::NUM_DOF;

/// Side information of one step.
#[derive(Clone, Debug, Default)]
pub struct StepInfo {
    /// Episode summary of the environments reset this step: `rew_<term>`
    /// means and task extras.
    pub episode: BTreeMap<String, f32>,
    /// Which environments ended by timeout rather than failure.
    pub time_outs: Vec<bool>,
    pub metrics: Option<EpisodeMetrics>,
}

#[derive(Clone, Debug)]
pub struct StepResult {
    /// `num_envs * obs_len` observations.
    pub obs: Vec<f32>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub info: StepInfo,
}

pub struct LeggedEnv<S: SimBackend, T: TaskHooks> {
    sim: S,
    task: T,
    config: WalkConfig,
    state: WalkState,
    bank: RewardBank,
    terrain: Terrain,
    rng: Rng,
    dt: f32,
    max_episode_length: u32,
}

impl<S: SimBackend, T: TaskHooks> LeggedEnv<S, T> {
    /// Checks the simulator against the configuration and pulls the
    /// initial state.
    ///
    /// # Errors
    /// Fails on an invalid configuration, a simulator whose counts disagree
    /// with it, an observation layout mismatch or an unknown reward term.
    pub fn new(mut sim: S, task: T, config: WalkConfig) -> Result<Self, EnvError> {
        config.validate()?;
        if sim.num_dof() != NUM_DOF {
            return Err(EnvError::InvalidConfig(format!(
                "simulator has {} joints, expected {NUM_DOF}",
                sim.num_dof()
            )));
        }
        if sim.num_envs() != config.env.num_envs {
            return Err(EnvError::InvalidConfig(format!(
                "simulator has {} environments, config declares {}",
                sim.num_envs(),
                config.env.num_envs
            )));
        }
        config.validate_bodies(sim.num_bodies())?;
        task.noise_scale_vector()?;

        let dt = config.control_dt();
        let max_episode_length = config.max_episode_length();
        let bank = RewardBank::new(&config.rewards, dt, config.env.num_envs)?;
        let terrain = config.terrain.clone();
        let mut state = WalkState::new(&config, sim.num_bodies());
        sim.refresh(&mut state.tensors)?;
        state.derive(&terrain);

        info!(
            num_envs = config.env.num_envs,
            obs_len = task.obs_len(),
            dt,
            max_episode_length,
            "walk environment ready"
        );
        Ok(Self {
            sim,
            task,
            rng: Rng::with_seed(config.seed),
            config,
            state,
            bank,
            terrain,
            dt,
            max_episode_length,
        })
    }

    #[must_use]
    pub fn num_envs(&self) -> usize {
        self.state.num_envs
    }

    #[must_use]
    pub fn obs_len(&self) -> usize {
        self.task.obs_len()
    }

    /// Control step in seconds.
    #[must_use]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    #[must_use]
    pub fn max_episode_length(&self) -> u32 {
        self.max_episode_length
    }

    #[must_use]
    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &WalkState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WalkState {
        &mut self.state
    }

    #[must_use]
    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    #[must_use]
    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    #[must_use]
    pub fn reward_bank(&self) -> &RewardBank {
        &self.bank
    }

    /// Current diffusion observation of every environment.
    #[must_use]
    pub fn diffusion_observation(&self) -> Vec<f32> {
        self.task.diffusion_observation(&self.state)
    }

    /// Clipped actions of the last step, `num_envs * 12` row-major.
    #[must_use]
    pub fn diffusion_action(&self) -> Vec<f32> {
        self.state.actions.iter().flatten().copied().collect()
    }

    /// Resets every environment and returns the first observation.
    ///
    /// # Errors
    /// Propagates simulator failures.
    pub fn reset_all(&mut self) -> Result<Vec<f32>, EnvError> {
        let all: Vec<usize> = (0..self.num_envs()).collect();
        self.reset(&all)?;
        let zeros = vec![0.0; self.num_envs() * NUM_DOF];
        Ok(self.step(&zeros)?.obs)
    }

    /// Resets `env_ids` and returns their episode summary.
    ///
    /// # Errors
    /// Fails on out-of-range ids or simulator write failures.
    pub fn reset(&mut self, env_ids: &[usize]) -> Result<BTreeMap<String, f32>, EnvError> {
        if env_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        self.state.tensors.check_env_ids(env_ids)?;

        let curriculum_due = self.config.commands.curriculum
            && self.state.common_step_counter % u64::from(self.max_episode_length) == 0;
        if curriculum_due {
            self.task.update_curriculum(&self.bank, env_ids);
        }

        self.task.reset_robot_states(&mut self.state, env_ids, &mut self.rng);
        self.sim.set_dof_state_indexed(&self.state.tensors, env_ids)?;
        self.sim.set_root_state_indexed(&self.state.tensors, env_ids)?;
        self.task.resample_commands(&mut self.state, env_ids, &mut self.rng);

        let state = &mut self.state;
        for &env in env_ids {
            state.last_actions[env] = [0.0; NUM_DOF];
            state.last_dof_vel[env] = [0.0; NUM_DOF];
            state.gait_index[env] = 0.0;
            state.episode_length[env] = 0;
            state.power_sum[env] = 0.0;
            state.reset_buf[env] = true;
        }

        let mut episode = self.bank.episode_summary(env_ids, self.config.env.episode_length_s);
        for (key, value) in self.task.episode_extras() {
            episode.insert(key.to_string(), value);
        }
        self.task.reset_idx(&mut self.state, env_ids);
        debug!(count = env_ids.len(), "environments reset");
        Ok(episode)
    }

    /// Applies `actions` (`num_envs * 12`, row-major) for one control step.
    ///
    /// # Errors
    /// Fails on a wrongly sized action buffer or a simulator failure.
    pub fn step(&mut self, actions: &[f32]) -> Result<StepResult, EnvError> {
        let expected = self.num_envs() * NUM_DOF;
        if actions.len() != expected {
            return Err(EnvError::ActionShape { got: actions.len(), expected });
        }
        let clip = self.config.normalization.clip_actions;
        for (dst, src) in self.state.actions.iter_mut().zip(actions.chunks_exact(NUM_DOF)) {
            for (d, &a) in dst.iter_mut().zip(src) {
                *d = a.clamp(-clip, clip);
            }
        }

        let sim_dt = self.config.sim.dt;
        let mut flat = vec![0.0; expected];
        for _ in 0..self.config.sim.decimation {
            for env in 0..self.num_envs() {
                let torques = pd_torques(
                    &self.config.control,
                    &self.config.init_state.default_joint_angles,
                    &self.state,
                    env,
                );
                self.state.torques[env] = torques;
                flat[env * NUM_DOF..(env + 1) * NUM_DOF].copy_from_slice(&torques);
            }
            self.sim.set_dof_actuation_force(&flat)?;
            self.sim.simulate()?;
            self.sim.refresh_dof_state(&mut self.state.tensors)?;

            for env in 0..self.num_envs() {
                let power: f32 = self
                    .state
                    .tensors
                    .env_dofs(env)
                    .iter()
                    .zip(&self.state.torques[env])
                    .map(|(d, t)| (t * d.vel).abs())
                    .sum();
                self.state.power_sum[env] += power * sim_dt;
            }
        }

        self.post_physics_step()
    }

    fn post_physics_step(&mut self) -> Result<StepResult, EnvError> {
        self.sim.refresh(&mut self.state.tensors)?;
        for len in &mut self.state.episode_length {
            *len += 1;
        }
        self.state.common_step_counter += 1;

        self.state.derive(&self.terrain);
        self.task
            .post_physics_step_callback(&mut self.state, self.dt, &mut self.rng);

        self.task.check_termination(&mut self.state);
        let rewards = self.bank.compute(&mut self.state, &self.config.rewards, self.dt);
        let dones = self.state.reset_buf.clone();
        let time_outs = self.state.time_out_buf.clone();
        let env_ids: Vec<usize> = dones
            .iter()
            .enumerate()
            .filter_map(|(env, &done)| done.then_some(env))
            .collect();
        let episode = self.reset(&env_ids)?;

        let obs = self.task.compute_observation(&self.state, &mut self.rng);
        self.state.snapshot_history();
        self.state.capture_initial_feet();

        Ok(StepResult {
            obs,
            rewards: rewards.total,
            dones,
            info: StepInfo {
                episode,
                time_outs,
                metrics: rewards.metrics,
            },
        })
    }
}

/// `clip(kp * (a * scale + q0 - q) - kd * qd, +-limit)` for one robot.
fn pd_torques(
    control: &ControlConfig,
    default_pos: &[f32; NUM_DOF],
    state: &WalkState,
    env: usize,
) -> [f32; NUM_DOF] {
    let mut out = [0.0; NUM_DOF];
    let actions = &state.actions[env];
    for (j, dof) in state.tensors.env_dofs(env).iter().enumerate() {
        let target = actions[j] * control.action_scale + default_pos[j];
        let tau = control.stiffness * (target - dof.pos) - control.damping * dof.vel;
        out[j] = tau.clamp(-control.torque_limit, control.torque_limit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pd_torque_saturates() {
        let mut cfg = WalkConfig::default();
        cfg.env.num_envs = 1;
        let mut state = WalkState::new(&cfg, 17);
        state.actions[0][0] = 100.0;
        state.tensors.env_dofs_mut(0)[1].vel = 2.0;
        let tau = pd_torques(&cfg.control, &cfg.init_state.default_joint_angles, &state, 0);
        assert_eq!(tau[0], cfg.control.torque_limit);
        // thigh: kp * 0.8 - kd * 2.0
        assert!((tau[1] - (20.0 * 0.8 - 0.5 * 2.0)).abs() < 1e-5);
    }
}
