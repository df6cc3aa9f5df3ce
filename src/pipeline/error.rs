// Pipeline Error Types
//
// Errors surfaced at the engine boundary, unifying each stage's errors.

use thiserror::Error;

use crate::catalog::validation_error::ValidationError;
use crate::query::executor::result::QueryError;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Execution failed: {0}")]
    Query(#[from] QueryError),
    /// Source missing, unreadable or malformed
    #[error("Extract error: {0}")]
    Extract(String),
    #[error("Load error: {0}")]
    Load(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type EtlResult<T> = Result<T, EtlError>;
