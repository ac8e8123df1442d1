//! Key space of the coordination store.

use std::fmt;

/// Network address of a source node.
pub type NodeAddr = u32;

/// Identity of a sink.
pub type SinkId = u32;

/// A key in the shared store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// One-shot election marker for a single packet instance.
    FirstReceiver { source: NodeAddr, seq: u32 },
    /// Credential of a source node.
    Auth { source: NodeAddr },
    /// Completed hand-off of a source node to a specific sink.
    ReAuth { source: NodeAddr, sink: SinkId },
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstReceiver { source, seq } => write!(f, "packet:first_receiver:{}:{}", source, seq),
            Self::Auth { source } => write!(f, "node:auth_status:{}", source),
            Self::ReAuth { source, sink } => write!(f, "node:re_auth_status:{}:{}", source, sink),
        }
    }
}
