#![deny(clippy::all, clippy::pedantic)]
//! Steps the walk environment on the mock simulator with a zero policy and
//! logs episode summaries.
//!
//! Usage: `walk_main [config.json] [steps]`. Log verbosity follows
//! `RUST_LOG` and defaults to `info`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use physics::{MockSim, MockSimConfig};
use tracing_subscriber::EnvFilter;
use walk_env::{LeggedEnv, WalkConfig, WalkTask, NUM_DOF};

const DEFAULT_STEPS: usize = 200;
const DEFAULT_NUM_ENVS: usize = 16;

fn load_config(path: Option<&str>) -> Result<WalkConfig> {
    match path {
        Some(path) => WalkConfig::from_path(path).with_context(|| format!("loading config {path}")),
        None => {
            let mut config = WalkConfig::default();
            config.env.num_envs = DEFAULT_NUM_ENVS;
            Ok(config)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = load_config(args.next().as_deref())?;
    let steps = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid step count `{s}`"))?,
        None => DEFAULT_STEPS,
    };
    if steps == 0 {
        tracing::warn!("no steps requested, only resetting");
    }

    let sim = MockSim::new(MockSimConfig {
        num_envs: config.env.num_envs,
        dt: config.sim.dt,
        ..MockSimConfig::default()
    });
    let task = WalkTask::new(&config).context("building walk task")?;
    let mut env = LeggedEnv::new(sim, task, config).context("building environment")?;
    env.reset_all()?;

    let actions = vec![0.0; env.num_envs() * NUM_DOF];
    let all_envs: Vec<usize> = (0..env.num_envs()).collect();
    let mut mean_reward = 0.0;
    let mut episodes = 0usize;
    for i in 0..steps {
        let result = env.step(&actions)?;
        #[allow(clippy::cast_precision_loss)]
        let step_mean = result.rewards.iter().sum::<f32>() / result.rewards.len() as f32;
        mean_reward += step_mean;
        if !result.info.episode.is_empty() {
            episodes += result.dones.iter().filter(|&&d| d).count();
            log_summary(i + 1, &result.info.episode);
        }
        if (i + 1) % 50 == 0 {
            tracing::info!(step = i + 1, mean_reward = step_mean, "rollout progress");
            if let Some(metrics) = &result.info.metrics {
                for (metric, value) in metrics.means(&all_envs) {
                    tracing::info!(step = i + 1, metric, value, "evaluation metric");
                }
            }
        }
    }

    tracing::info!(steps, episodes, total_mean_reward = mean_reward, "rollout finished");
    Ok(())
}

fn log_summary(step: usize, episode: &BTreeMap<String, f32>) {
    for (key, value) in episode {
        tracing::info!(step, key = key.as_str(), value, "episode summary");
    }
}
