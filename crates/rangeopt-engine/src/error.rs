use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Malformed *inputs* (sources, specifications) never produce these: they
/// degrade to default facts or no-op edits. These are usage and boundary errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("classifier bank is not trained; call `ClassifierBank::train` before predicting")]
    NotTrained,

    #[error("unknown optimization id `{0}`")]
    UnknownOptimization(String),

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature row has {actual} columns, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
