use crate::error::PhysicsError;
use crate::tensors::SimTensors;

/// Seam to the batched rigid-body simulator.
///
/// The environment never touches simulator internals: it reads state by
/// asking the backend to refresh a host-side [`SimTensors`] copy, and writes
/// resets back through the indexed setters, which must leave environments
/// outside `env_ids` untouched.
pub trait SimBackend {
    fn num_envs(&self) -> usize;

    fn num_bodies(&self) -> usize;

    fn num_dof(&self) -> usize;

    /// Sets joint torques for the next [`simulate`](SimBackend::simulate)
    /// call. `torques` holds `num_envs * num_dof` values.
    ///
    /// # Errors
    /// Returns [`PhysicsError::ShapeMismatch`] for a wrongly sized buffer.
    fn set_dof_actuation_force(&mut self, torques: &[f32]) -> Result<(), PhysicsError>;

    /// Advances the simulation by one physics sub-step.
    ///
    /// # Errors
    /// Backend-specific stepping failures.
    fn simulate(&mut self) -> Result<(), PhysicsError>;

    /// Copies the joint state only (cheap refresh between sub-steps).
    ///
    /// # Errors
    /// Returns [`PhysicsError::ShapeMismatch`] when `tensors` was sized for
    /// another simulator.
    fn refresh_dof_state(&mut self, tensors: &mut SimTensors) -> Result<(), PhysicsError>;

    /// Copies root, rigid-body, contact-force and joint state.
    ///
    /// # Errors
    /// As [`refresh_dof_state`](SimBackend::refresh_dof_state).
    fn refresh(&mut self, tensors: &mut SimTensors) -> Result<(), PhysicsError>;

    /// Writes the joint state of `env_ids` from `tensors` into the simulator.
    ///
    /// # Errors
    /// Fails on mismatched tensors or an id outside `0..num_envs`.
    fn set_dof_state_indexed(
        &mut self,
        tensors: &SimTensors,
        env_ids: &[usize],
    ) -> Result<(), PhysicsError>;

    /// Writes the root state of `env_ids` from `tensors` into the simulator.
    ///
    /// # Errors
    /// Fails on mismatched tensors or an id outside `0..num_envs`.
    fn set_root_state_indexed(
        &mut self,
        tensors: &SimTensors,
        env_ids: &[usize],
    ) -> Result<(), PhysicsError>;
}
