#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Simulator Seam
//!
//! Host-side view of a batched rigid-body simulator for legged robots.
//!
//! The physics engine itself is an external collaborator. This crate only
//! defines what the environment needs from it:
//!
//! -   **Layouts:** [`RootState`], [`RigidBodyState`] and [`DofState`] mirror
//!     the simulator's flat tensors, defined in the [`types`] module.
//! -   **Buffers:** [`SimTensors`] holds the batched copies for every
//!     environment, indexed environment-major.
//! -   **Backend:** the [`SimBackend`] trait covers stepping, refreshing and
//!     indexed state writes. With the `mock` feature, [`MockSim`] provides a
//!     kinematic CPU implementation.
//!
//! ```rust,ignore
//! use physics::{MockSim, MockSimConfig, SimBackend, SimTensors};
//!
//! let mut sim = MockSim::new(MockSimConfig::default());
//! let mut tensors = SimTensors::zeros(sim.num_envs(), sim.num_bodies(), sim.num_dof());
//! sim.simulate()?;
//! sim.refresh(&mut tensors)?;
//! ```

pub mod backend;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod tensors;
pub mod types;

pub use backend::SimBackend;
pub use error::PhysicsError;
#[cfg(feature = "mock")]
pub use mock::{MockSim, MockSimConfig};
pub use tensors::SimTensors;
pub use types::{ContactForce, DofState, RigidBodyState, RootState};
