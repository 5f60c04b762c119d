use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhysicsError {
    #[error("tensor shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    #[error("environment index {index} out of range for {num_envs} environments")]
    EnvIndexOutOfRange { index: usize, num_envs: usize },
}
