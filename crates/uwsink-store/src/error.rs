//! Error types for uwsink-store.

use thiserror::Error;

/// Result type for coordination store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a coordination store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend could not be reached or did not answer in time.
    #[error("coordination store unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with an error or an unexpected reply.
    #[error("coordination store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    /// Whether the connection should be considered broken.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal() {
            StoreError::Unreachable(e.to_string())
        } else {
            StoreError::Protocol(e.to_string())
        }
    }
}
