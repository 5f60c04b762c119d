//! # Reward Bank
//!
//! Reward terms are looked up by name in a static catalog. Only terms with a
//! non-zero configured scale are registered, and each scale is pre-multiplied
//! by the control step so episode sums are time-integrated.
//!
//! `evaluate_metrics` is registered like any other term but contributes no
//! reward. Its presence turns on the evaluation metrics side channel.

pub mod metrics;
pub mod terms;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::RewardsConfig;
use crate::error::EnvError;
use crate::state::WalkState;

pub use metrics::EpisodeMetrics;

/// Everything a reward term may read for one step.
pub struct RewardContext<'a> {
    pub state: &'a WalkState,
    pub cfg: &'a RewardsConfig,
    /// Control step in seconds.
    pub dt: f32,
}

pub type RewardFn = fn(&RewardContext<'_>, usize) -> f32;

const METRICS_TERM: &str = "evaluate_metrics";

const CATALOG: &[(&str, RewardFn)] = &[
    ("lift_up", terms::lift_up),
    ("lift_up_linear", terms::lift_up_linear),
    ("tracking_lin_vel", terms::tracking_lin_vel),
    ("tracking_ang_vel", terms::tracking_ang_vel),
    ("feet_clearance_cmd_linear", terms::feet_clearance_cmd_linear),
    ("rear_air", terms::rear_air),
    ("stand_air", terms::stand_air),
    ("foot_twist", terms::foot_twist),
    ("feet_slip", terms::feet_slip),
    ("foot_shift", terms::foot_shift),
    ("front_contact_force", terms::front_contact_force),
    ("hip_still", terms::hip_still),
    ("action_rate", terms::action_rate),
    ("dof_acc", terms::dof_acc),
    ("torques", terms::torques),
    ("termination", terms::termination),
    (METRICS_TERM, terms::evaluate_metrics),
];

#[derive(Clone, Copy, Debug)]
struct RegisteredTerm {
    name: &'static str,
    scale: f32,
    func: RewardFn,
}

/// Result of one reward evaluation.
#[derive(Clone, Debug, Default)]
pub struct RewardBreakdown {
    pub total: Vec<f32>,
    /// Scaled per-term values, keyed by term name.
    pub terms: BTreeMap<&'static str, Vec<f32>>,
    pub metrics: Option<EpisodeMetrics>,
}

#[derive(Clone, Debug)]
pub struct RewardBank {
    terms: Vec<RegisteredTerm>,
    episode_sums: BTreeMap<&'static str, Vec<f32>>,
    only_positive: bool,
    evaluate_metrics: bool,
    num_envs: usize,
}

impl RewardBank {
    /// Registers every term with a non-zero scale.
    ///
    /// # Errors
    /// Returns [`EnvError::UnknownRewardTerm`] for a scale naming no known term.
    pub fn new(cfg: &RewardsConfig, dt: f32, num_envs: usize) -> Result<Self, EnvError> {
        let mut terms = Vec::new();
        let mut evaluate_metrics = false;
        for (name, &scale) in &cfg.scales {
            let &(name, func) = CATALOG
                .iter()
                .find(|(known, _)| *known == name.as_str())
                .ok_or_else(|| EnvError::UnknownRewardTerm(name.clone()))?;
            if scale == 0.0 {
                debug!(term = name, "reward term disabled");
                continue;
            }
            if name == METRICS_TERM {
                evaluate_metrics = true;
            }
            terms.push(RegisteredTerm { name, scale: scale * dt, func });
        }
        info!(
            terms = ?terms.iter().map(|t| t.name).collect::<Vec<_>>(),
            "reward bank ready"
        );
        let episode_sums = terms.iter().map(|t| (t.name, vec![0.0; num_envs])).collect();
        Ok(Self {
            terms,
            episode_sums,
            only_positive: cfg.only_positive_rewards,
            evaluate_metrics,
            num_envs,
        })
    }

    /// Scale of a registered term, already multiplied by the control step.
    #[must_use]
    pub fn scale(&self, term: &str) -> Option<f32> {
        self.terms.iter().find(|t| t.name == term).map(|t| t.scale)
    }

    /// Mean accumulated episode reward of `term` over `env_ids`.
    #[must_use]
    pub fn mean_episode_sum(&self, term: &str, env_ids: &[usize]) -> Option<f32> {
        let sums = self.episode_sums.get(term)?;
        if env_ids.is_empty() {
            return Some(0.0);
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = env_ids.iter().map(|&e| sums[e]).sum::<f32>() / env_ids.len() as f32;
        Some(mean)
    }

    #[must_use]
    pub fn episode_sum(&self, term: &str, env: usize) -> Option<f32> {
        self.episode_sums.get(term).map(|sums| sums[env])
    }

    /// Evaluates every registered term, accumulates episode sums, and, when
    /// metrics are enabled, consumes the per-episode power accumulator.
    pub fn compute(&mut self, state: &mut WalkState, cfg: &RewardsConfig, dt: f32) -> RewardBreakdown {
        let mut out = RewardBreakdown {
            total: vec![0.0; self.num_envs],
            ..RewardBreakdown::default()
        };
        {
            let ctx = RewardContext { state: &*state, cfg, dt };
            for term in &self.terms {
                let values: Vec<f32> = (0..self.num_envs)
                    .map(|env| (term.func)(&ctx, env) * term.scale)
                    .collect();
                for ((total, sum), v) in out
                    .total
                    .iter_mut()
                    .zip(self.episode_sums.entry(term.name).or_default())
                    .zip(&values)
                {
                    *total += v;
                    *sum += v;
                }
                out.terms.insert(term.name, values);
            }
            if self.only_positive {
                for total in &mut out.total {
                    *total = total.max(0.0);
                }
            }
            if self.evaluate_metrics {
                out.metrics = Some(EpisodeMetrics::evaluate(&ctx));
            }
        }
        if out.metrics.is_some() {
            state.power_sum.fill(0.0);
        }
        out
    }

    /// Per-term `rew_<name>` means over `env_ids`, normalised by episode
    /// duration. Zeroes the sums of those environments.
    pub fn episode_summary(&mut self, env_ids: &[usize], episode_length_s: f32) -> BTreeMap<String, f32> {
        let mut summary = BTreeMap::new();
        for (name, sums) in &mut self.episode_sums {
            if !env_ids.is_empty() {
                #[allow(clippy::cast_precision_loss)]
                let mean = env_ids.iter().map(|&e| sums[e]).sum::<f32>() / env_ids.len() as f32;
                summary.insert(format!("rew_{name}"), mean / episode_length_s);
            }
            for &e in env_ids {
                sums[e] = 0.0;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalkConfig;

    fn config() -> WalkConfig {
        let mut cfg = WalkConfig::default();
        cfg.env.num_envs = 2;
        cfg
    }

    #[test]
    fn scales_are_multiplied_by_dt() {
        let cfg = config();
        let bank = RewardBank::new(&cfg.rewards, 0.02, 2).unwrap();
        let scale = bank.scale("tracking_lin_vel").unwrap();
        assert!((scale - 0.02).abs() < 1e-7);
        assert!(bank.scale("lift_up").is_none());
    }

    #[test]
    fn zero_scales_are_not_registered() {
        let mut cfg = config();
        cfg.rewards.scales.insert("rear_air".into(), 0.0);
        let bank = RewardBank::new(&cfg.rewards, 0.02, 2).unwrap();
        assert_eq!(bank.scale("rear_air"), None);
        assert_eq!(bank.mean_episode_sum("rear_air", &[0]), None);
    }

    #[test]
    fn unknown_term_is_rejected() {
        let mut cfg = config();
        cfg.rewards.scales.insert("moonwalk".into(), 1.0);
        let err = RewardBank::new(&cfg.rewards, 0.02, 2).unwrap_err();
        assert!(matches!(err, EnvError::UnknownRewardTerm(name) if name == "moonwalk"));
    }

    #[test]
    fn summary_zeroes_only_selected_envs() {
        let cfg = config();
        let mut bank = RewardBank::new(&cfg.rewards, 0.02, 2).unwrap();
        bank.episode_sums.insert("torques", vec![2.0, 4.0]);
        let summary = bank.episode_summary(&[1], 20.0);
        assert!((summary["rew_torques"] - 0.2).abs() < 1e-6);
        assert_eq!(bank.episode_sum("torques", 0), Some(2.0));
        assert_eq!(bank.episode_sum("torques", 1), Some(0.0));
    }

    #[test]
    fn catalog_has_unique_names() {
        let mut names: Vec<_> = CATALOG.iter().map(|(name, _)| *name).collect();
        let len = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), len);
    }
}
