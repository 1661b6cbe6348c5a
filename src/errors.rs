use thiserror::Error;

/// Error type that captures common ledger-core failures.
///
/// Validation and state-conflict errors are raised before any mutation
/// begins; errors raised mid-operation abandon the unit of work, which
/// discards every staged write.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("State conflict: {0}")]
    StateConflict(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
