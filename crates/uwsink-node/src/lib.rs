//! uwsink Node - multi-sink packet reception with shared coordination
//!
//! A sink receives constant-bit-rate traffic from mobile sources. Several
//! sinks may hear the same transmission; they coordinate through a shared
//! store so that exactly one of them reacts to each packet.
//!
//! # Architecture
//!
//! ```text
//! datagram ──► SinkModule::receive
//!                 │ type filter ─► sequence tracker ─► statistics
//!                 │ first-receiver election (store)
//!                 │ trace ─► authentication (store)
//!                 ▼
//!              response packets ──► downlink
//!
//! TrafficTimer ──► SinkModule::transmit ──► downlink
//! admin socket ──► start / stop / stats / trace / priority
//! ```
//!
//! The daemon ([`SinkNode`]) wraps one [`SinkModule`] in tokio tasks: a UDP
//! receive loop, a periodic transmitter and the admin socket.

pub mod admin_socket;
pub mod config;
pub mod error;
pub mod node;
pub mod packet;
pub mod sink;
pub mod tracer;
pub mod traffic;

pub use config::{NodeConfig, SinkConfig};
pub use error::{DropReason, Error, Result};
pub use node::{NodeClock, SinkHandle, SinkNode};
pub use packet::{Packet, PacketId, PacketType, Priority};
pub use sink::{Delivery, InvalidPacket, Reception, SharedStore, SinkModule, StatsSnapshot};
pub use tracer::{TraceRecord, Tracer};
pub use traffic::{TrafficPattern, TrafficTimer};
