//! Packet model exchanged with the network stack.

use serde::{Deserialize, Serialize};
use uwsink_stats::SeqNo;
use uwsink_store::NodeAddr;

use crate::error::{Error, Result};

/// Unique packet identifier, assigned by the sending module.
pub type PacketId = u64;

/// Protocol kind of a packet, as set by the sending module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    /// Constant-bit-rate application traffic: the only kind a sink accepts.
    Cbr,
    /// Any other protocol.
    Other(u16),
}

/// Transmission priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Low,
    High,
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "0" => Ok(Self::Low),
            "high" | "1" => Ok(Self::High),
            other => Err(Error::InvalidConfiguration(format!("unknown priority {:?}", other))),
        }
    }
}

/// Header fields of one packet plus its size.
///
/// The payload itself is never inspected; `size` stands for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Identifier assigned by the sender
    pub uid: PacketId,
    /// Protocol kind
    pub ptype: PacketType,
    /// Size in bytes
    pub size: u32,
    /// Send timestamp (simulation seconds)
    pub timestamp: f64,
    /// Source address
    pub src: NodeAddr,
    /// Destination address
    pub dst: NodeAddr,
    /// Destination port
    pub dst_port: u16,
    /// Sequence number from the sender's transmit counter
    pub seq: SeqNo,
    /// Transmission priority
    pub priority: Priority,
    /// Role tag (traffic type)
    pub role: u32,
    /// Forward-trip time last observed by the sender, echoed back
    pub rftt: Option<f64>,
}

impl Packet {
    /// A `Cbr` packet with default priority and no echoed FTT.
    pub fn cbr(src: NodeAddr, dst: NodeAddr, seq: SeqNo, role: u32, size: u32, timestamp: f64) -> Self {
        Self {
            uid: 0,
            ptype: PacketType::Cbr,
            size,
            timestamp,
            src,
            dst,
            dst_port: 0,
            seq,
            priority: Priority::Low,
            role,
            rftt: None,
        }
    }

    /// Attach an echoed forward-trip time.
    #[must_use]
    pub fn with_rftt(mut self, rftt: f64) -> Self {
        self.rftt = Some(rftt);
        self
    }

    /// Encode for the datagram transport.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
