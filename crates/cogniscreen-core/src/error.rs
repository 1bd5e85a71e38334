//! Error types for the CogniScreen domain crate

use thiserror::Error;

/// Result type alias for domain operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the domain collaborators (evaluator, store, question bank)
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Evaluator error: {0}")]
    Evaluator(String),

    #[error("Result store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for CoreError {
    fn from(err: sled::Error) -> Self {
        CoreError::Store(err.to_string())
    }
}
