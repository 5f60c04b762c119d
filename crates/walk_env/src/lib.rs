#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! # Quadruped Walk Environment
//!
//! A batched reinforcement-learning environment teaching a quadruped to rise
//! onto its hind legs and walk. Thousands of environments advance in
//! lockstep over a [`physics::SimBackend`].
//!
//! ## Key Components
//!
//! -   **Configuration:** [`WalkConfig`] is deserialised from JSON with a
//!     default for every field, see [`config`].
//! -   **Commands:** [`CommandSampler`] draws velocity and heading targets
//!     and widens its ranges as tracking improves.
//! -   **Observations:** [`ObservationBuilder`] flattens the robot state
//!     into the policy input, with optional noise.
//! -   **Rewards:** [`RewardBank`] evaluates the named shaping terms that
//!     carry a non-zero scale and keeps their episode sums.
//! -   **Orchestration:** [`LeggedEnv`] runs the step pipeline and calls the
//!     [`TaskHooks`] of a task such as [`WalkTask`].
//!
//! ```rust,ignore
//! use physics::{MockSim, MockSimConfig};
//! use walk_env::{LeggedEnv, WalkConfig, WalkTask};
//!
//! let config = WalkConfig::from_path("walk.json")?;
//! let sim = MockSim::new(MockSimConfig { num_envs: config.env.num_envs, ..Default::default() });
//! let mut env = LeggedEnv::new(sim, WalkTask::new(&config)?, config)?;
//! let obs = env.reset_all()?;
//! let step = env.step(&vec![0.0; env.num_envs() * walk_env::NUM_DOF])?;
//! ```

pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod gait;
pub mod math;
pub mod observation;
pub mod rewards;
pub mod state;
pub mod task;
pub mod terrain;
pub mod termination;

/// Legs per robot.
pub const NUM_LEGS: usize = 4;
/// Actuated joints per robot: hip, thigh and calf on each leg.
pub const NUM_DOF: usize = 12;

pub use commands::{CommandRanges, CommandSampler};
pub use config::{Mode, WalkConfig};
pub use env::{LeggedEnv, StepInfo, StepResult};
pub use error::EnvError;
pub use observation::ObservationBuilder;
pub use rewards::{EpisodeMetrics, RewardBank, RewardBreakdown};
pub use state::WalkState;
pub use task::{TaskHooks, WalkTask};
pub use terrain::Terrain;
