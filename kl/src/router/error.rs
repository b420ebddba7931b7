//! Router error types

use thiserror::Error;

/// Errors returned by router operations
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),
}
