//! Transport error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while executing a request
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }

    /// HTTP status for status errors
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        assert!(TransportError::Timeout(Duration::from_secs(30)).is_timeout());
        assert!(!TransportError::Unavailable("closed".to_string()).is_timeout());
    }

    #[test]
    fn test_status() {
        let err = TransportError::Status {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "HTTP error 503: Service unavailable");
        assert_eq!(TransportError::Timeout(Duration::from_secs(1)).status(), None);
    }
}
