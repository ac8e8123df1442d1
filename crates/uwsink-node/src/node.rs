//! Sink node daemon.
//!
//! Inbound packets arrive as datagrams on `bind_addr`; responses and periodic
//! traffic leave as datagrams towards `downlink_addr`. The sink module is
//! shared between the receive loop, the transmit task and the admin socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::admin_socket::AdminSocket;
use crate::config::NodeConfig;
use crate::error::Result;
use crate::packet::{Packet, Priority};
use crate::sink::{SharedStore, SinkModule};

/// Largest datagram the receive loop accepts.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Wall-clock seconds since a shared epoch, the time base of every packet
/// timestamp and of the expirations written to the store.
///
/// Sinks sharing a store compare each other's expirations, so they must
/// agree on the epoch. The default is the Unix epoch.
#[derive(Debug, Clone, Copy)]
pub struct NodeClock {
    epoch: SystemTime,
}

impl NodeClock {
    pub fn new() -> Self {
        Self { epoch: UNIX_EPOCH }
    }

    /// Count from `seconds` after the Unix epoch.
    pub fn with_epoch(seconds: f64) -> Self {
        let offset = Duration::try_from_secs_f64(seconds).unwrap_or_default();
        Self {
            epoch: UNIX_EPOCH + offset,
        }
    }

    pub fn now(&self) -> f64 {
        match SystemTime::now().duration_since(self.epoch) {
            Ok(elapsed) => elapsed.as_secs_f64(),
            // before the epoch
            Err(e) => -e.duration().as_secs_f64(),
        }
    }
}

impl Default for NodeClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle on a running sink.
pub struct SinkHandle {
    sink: Mutex<SinkModule>,
    socket: UdpSocket,
    downlink: SocketAddr,
    clock: NodeClock,
    transmitter: Mutex<Option<JoinHandle<()>>>,
}

impl SinkHandle {
    pub fn sink(&self) -> &Mutex<SinkModule> {
        &self.sink
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Decode one datagram and run it through the pipeline.
    pub async fn handle_datagram(&self, bytes: &[u8], from: SocketAddr) {
        let packet = match Packet::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(%from, len = bytes.len(), "Undecodable datagram: {}", e);
                return;
            }
        };

        let now = self.clock.now();
        let responses = {
            let mut sink = self.sink.lock().await;
            // Store calls block; keep them off the async workers.
            tokio::task::block_in_place(|| sink.receive(&packet, now)).into_responses()
        };
        self.send_down(&responses).await;
    }

    /// Start (or restart) periodic traffic.
    pub async fn start(self: &Arc<Self>) {
        let now = self.clock.now();
        self.sink.lock().await.start(now);

        let handle = Arc::clone(self);
        let task = tokio::spawn(async move { handle.run_transmitter().await });
        if let Some(previous) = self.transmitter.lock().await.replace(task) {
            previous.abort();
        }
    }

    /// Stop periodic traffic. Returns whether it was running.
    pub async fn stop(&self) -> bool {
        let was_running = self.sink.lock().await.stop();
        if let Some(task) = self.transmitter.lock().await.take() {
            task.abort();
        }
        was_running
    }

    /// Send one packet outside the periodic schedule.
    pub async fn send_packet(&self, priority: Option<Priority>) -> Packet {
        let now = self.clock.now();
        let packet = self.sink.lock().await.send_packet(priority, now);
        self.send_down(std::slice::from_ref(&packet)).await;
        packet
    }

    async fn run_transmitter(&self) {
        loop {
            let Some(deadline) = self.sink.lock().await.next_transmission() else {
                break;
            };
            let wait = (deadline - self.clock.now()).max(0.0);
            tokio::time::sleep(Duration::try_from_secs_f64(wait).unwrap_or_default()).await;

            let packet = self.sink.lock().await.on_timer(self.clock.now());
            if let Some(packet) = packet {
                self.send_down(std::slice::from_ref(&packet)).await;
            }
        }
    }

    async fn send_down(&self, packets: &[Packet]) {
        for packet in packets {
            let bytes = match packet.encode() {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(uid = packet.uid, "Failed to encode packet: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.socket.send_to(&bytes, self.downlink).await {
                tracing::warn!(uid = packet.uid, downlink = %self.downlink, "Failed to send packet: {}", e);
            }
        }
    }
}

/// A sink node instance.
pub struct SinkNode {
    handle: Arc<SinkHandle>,
    config: NodeConfig,
}

impl SinkNode {
    /// Create a new sink node over `store`.
    pub async fn new(config: NodeConfig, store: SharedStore) -> Result<Self> {
        let sink = SinkModule::new(config.sink.clone(), store)?;
        let socket = UdpSocket::bind(config.bind_addr).await?;

        let handle = Arc::new(SinkHandle {
            sink: Mutex::new(sink),
            socket,
            downlink: config.downlink_addr,
            clock: NodeClock::with_epoch(config.clock_epoch),
            transmitter: Mutex::new(None),
        });

        Ok(Self { handle, config })
    }

    pub fn handle(&self) -> Arc<SinkHandle> {
        Arc::clone(&self.handle)
    }

    /// Run the node until the receive socket fails.
    pub async fn run(self) -> Result<()> {
        let local = self.handle.local_addr()?;
        tracing::info!("Sink node {} starting", self.config.sink.sink_id);
        tracing::info!("  Listening on: {}", local);
        tracing::info!("  Downlink: {}", self.config.downlink_addr);
        tracing::info!("  Store: {}", self.config.redis_url);
        tracing::info!("  Admin socket: {}", self.config.admin_socket.display());
        tracing::info!("  Clock epoch: {}", self.config.clock_epoch);

        if let Some(parent) = self.config.admin_socket.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let admin = AdminSocket::new(self.handle(), &self.config.admin_socket.to_string_lossy());
        tokio::spawn(async move {
            if let Err(e) = admin.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        if self.config.autostart {
            self.handle.start().await;
        }

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = self.handle.socket.recv_from(&mut buf).await?;
            self.handle.handle_datagram(&buf[..len], from).await;
        }
    }
}
