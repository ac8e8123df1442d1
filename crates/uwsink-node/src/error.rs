//! Error types for the sink node.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for sink node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sink node operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration rejected at startup
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Coordination store error
    #[error("Store error: {0}")]
    Store(#[from] uwsink_store::StoreError),

    /// Packet encoding error
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed trace line
    #[error("Invalid trace record: {0}")]
    InvalidTrace(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an inbound packet was dropped by the reception pipeline.
///
/// Drops are local to one packet and never abort the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Not a packet of this protocol. Counted as invalid.
    #[error("unknown packet type")]
    UnknownPacketType,

    /// Sequence number already seen. Counted as invalid.
    #[error("duplicated packet")]
    DuplicatePacket,

    /// Behind the expected sequence number under strict ordering. Counted as
    /// out of order.
    #[error("packet out of sequence")]
    OutOfSequencePacket,
}
