use physics::PhysicsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("observation layout has {layout} slots but num_single_state is {declared}")]
    ObservationLayout { layout: usize, declared: usize },
    #[error("unknown reward term `{0}`")]
    UnknownRewardTerm(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("action buffer has {got} values, expected {expected}")]
    ActionShape { got: usize, expected: usize },
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
}
