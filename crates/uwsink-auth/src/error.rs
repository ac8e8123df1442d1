//! Error types for uwsink-auth.

use thiserror::Error;
use uwsink_store::StoreError;

/// Result type for uwsink-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the authentication protocol.
#[derive(Debug, Error)]
pub enum Error {
    /// The coordination store failed; the current packet's authentication
    /// step is abandoned.
    #[error("coordination store: {0}")]
    Store(#[from] StoreError),

    /// The role tag does not name an authentication request.
    #[error("unknown request role tag {0}")]
    UnknownRole(u32),
}

impl Error {
    /// Whether the store could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_unreachable())
    }
}
