//! Sink Module - reception pipeline and periodic transmission.
//!
//! Every inbound packet runs through the same fixed stages:
//!
//! 1. **Type filter**: anything but CBR traffic is invalid.
//! 2. **Sequence classification**: duplicates and (under strict ordering)
//!    late packets are dropped.
//! 3. **Statistics**: RTT/FTT samples, received and lost counters,
//!    throughput.
//! 4. **Election**: race the other sinks for first-receiver status of
//!    `(source, seq)` in the coordination store.
//! 5. **Trace**: winners append one trace line.
//! 6. **Authentication**: winners decide on the role tag and may answer the
//!    source with one response packet.
//!
//! Store failures abandon stages 4-6 for that packet only; the statistics
//! already recorded stand.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uwsink_auth::{AuthCoordinator, Decision, RequestRole, ResponseRole};
use uwsink_stats::{Classification, OrderPolicy, ReceptionStats, SeqNo, SequenceTracker};
use uwsink_store::{CoordinationStore, NodeAddr, SinkId};

use crate::config::SinkConfig;
use crate::error::{DropReason, Result};
use crate::packet::{Packet, PacketId, PacketType, Priority};
use crate::tracer::{TraceRecord, Tracer};
use crate::traffic::TrafficTimer;

/// Maximum number of dropped packets remembered for inspection.
pub const MAX_INVALID_LOG: usize = 1024;

/// Coordination store as held by a sink.
pub type SharedStore = Box<dyn CoordinationStore + Send>;

/// What happened to one inbound packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Reception {
    /// Rejected before the statistics stage.
    Dropped(DropReason),
    /// Counted in the statistics.
    Accepted(Delivery),
}

/// Outcome of an accepted packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub classification: Classification,
    /// This sink won the first-receiver election.
    pub first_receiver: bool,
    /// Authentication outcome, for winners with an authentication role.
    pub decision: Option<Decision>,
    /// The coordination store failed and coordination was skipped.
    pub abandoned: bool,
    /// Packets to hand to the network stack.
    pub responses: Vec<Packet>,
}

impl Reception {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped(_))
    }

    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Self::Dropped(reason) => Some(*reason),
            Self::Accepted(_) => None,
        }
    }

    pub fn delivery(&self) -> Option<&Delivery> {
        match self {
            Self::Dropped(_) => None,
            Self::Accepted(delivery) => Some(delivery),
        }
    }

    /// Response packets, empty for dropped packets.
    pub fn responses(&self) -> &[Packet] {
        match self {
            Self::Dropped(_) => &[],
            Self::Accepted(delivery) => &delivery.responses,
        }
    }

    pub fn into_responses(self) -> Vec<Packet> {
        match self {
            Self::Dropped(_) => Vec::new(),
            Self::Accepted(delivery) => delivery.responses,
        }
    }
}

/// A dropped packet kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidPacket {
    pub uid: PacketId,
    pub src: NodeAddr,
    pub seq: SeqNo,
    pub reason: DropReason,
    pub at: f64,
}

/// Read-only view of a sink's statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub sink_id: SinkId,
    pub order_policy: OrderPolicy,
    pub rtt: f64,
    pub rtt_std: f64,
    pub ftt: f64,
    pub ftt_std: f64,
    pub per: f64,
    pub throughput: f64,
    pub sent: u64,
    pub received: u64,
    pub out_of_order: u64,
    pub lost: u64,
    pub invalid: u64,
    pub highest_seq: SeqNo,
    pub cross_cluster_handoffs: u64,
    pub auth_requests_served: u64,
    pub store_failures: u64,
}

/// One sink: reception pipeline, coordination and periodic traffic.
pub struct SinkModule {
    config: SinkConfig,
    tracker: SequenceTracker,
    stats: ReceptionStats,
    auth: AuthCoordinator,
    store: SharedStore,
    tracer: Option<Tracer>,
    timer: TrafficTimer,
    rng: StdRng,
    priority: Priority,
    next_tx_seq: SeqNo,
    next_uid: PacketId,
    last_ftt: Option<f64>,
    last_receive_time: f64,
    store_failures: u64,
    invalid_log: VecDeque<InvalidPacket>,
}

impl SinkModule {
    /// Create a sink over `store`.
    ///
    /// Fails with `InvalidConfiguration` if the settings are unusable, and
    /// with an IO error if a startup trace file cannot be opened.
    pub fn new(config: SinkConfig, store: SharedStore) -> Result<Self> {
        config.validate()?;
        let timer = TrafficTimer::new(config.traffic_pattern()?);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut sink = Self {
            tracker: SequenceTracker::new(config.order_policy),
            stats: ReceptionStats::new(),
            auth: AuthCoordinator::new(config.sink_id, config.auth),
            store,
            tracer: None,
            timer,
            rng,
            priority: config.priority,
            next_tx_seq: 1,
            next_uid: 0,
            last_ftt: None,
            last_receive_time: 0.0,
            store_failures: 0,
            invalid_log: VecDeque::new(),
            config,
        };

        if let Some(suffix) = sink.config.trace_suffix.clone() {
            sink.set_trace(&suffix, None)?;
        }

        info!(
            sink_id = sink.config.sink_id,
            address = sink.config.address,
            policy = ?sink.config.order_policy,
            "Sink module created"
        );
        Ok(sink)
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    pub fn sink_id(&self) -> SinkId {
        self.config.sink_id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn stats(&self) -> &ReceptionStats {
        &self.stats
    }

    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    pub fn coordinator(&self) -> &AuthCoordinator {
        &self.auth
    }

    /// Coordination steps skipped because the store failed.
    pub fn store_failures(&self) -> u64 {
        self.store_failures
    }

    /// Packets transmitted so far.
    pub fn sent(&self) -> u64 {
        u64::from(self.next_tx_seq.wrapping_sub(1))
    }

    /// Recently dropped invalid packets, oldest first.
    pub fn invalid_packets(&self) -> Vec<InvalidPacket> {
        self.invalid_log.iter().cloned().collect()
    }

    /// Run one inbound packet through the pipeline.
    pub fn receive(&mut self, packet: &Packet, now: f64) -> Reception {
        if packet.ptype != PacketType::Cbr {
            self.stats.record_invalid();
            return self.drop_packet(packet, DropReason::UnknownPacketType, now);
        }

        let classification = self.tracker.classify(packet.seq);
        match classification {
            Classification::Duplicate => {
                self.stats.record_invalid();
                return self.drop_packet(packet, DropReason::DuplicatePacket, now);
            }
            Classification::OutOfOrderDiscard => {
                self.stats.record_out_of_order();
                debug!(
                    sink_id = self.config.sink_id,
                    seq = packet.seq,
                    expected = self.tracker.expected(),
                    "Dropped packet out of sequence"
                );
                return Reception::Dropped(DropReason::OutOfSequencePacket);
            }
            Classification::OutOfOrderKeep => self.stats.record_out_of_order(),
            Classification::InOrder { .. } => {}
        }

        let ftt = now - packet.timestamp;
        if let Some(echoed) = packet.rftt {
            self.stats.record_rtt(ftt + echoed);
        }
        self.stats.record_ftt(ftt);
        self.last_ftt = Some(ftt);
        self.stats.record_received();
        self.stats.record_lost(classification.lost());
        self.stats
            .record_throughput(u64::from(packet.size), now - self.last_receive_time);
        self.last_receive_time = now;

        let mut delivery = Delivery {
            classification,
            first_receiver: false,
            decision: None,
            abandoned: false,
            responses: Vec::new(),
        };
        self.coordinate(packet, now, &mut delivery);

        if self.config.order_policy == OrderPolicy::StrictOrder
            && !self.stats.loss_invariant_holds(self.tracker.highest())
        {
            error!(
                sink_id = self.config.sink_id,
                received = self.stats.received(),
                lost = self.stats.lost(),
                last_reset = self.stats.last_reset(),
                hrsn = self.tracker.highest(),
                "Loss accounting out of balance"
            );
        }

        Reception::Accepted(delivery)
    }

    fn coordinate(&mut self, packet: &Packet, now: f64, delivery: &mut Delivery) {
        match self.auth.elect(&mut self.store, packet.src, packet.seq) {
            Ok(won) => delivery.first_receiver = won,
            Err(e) => {
                self.abandon(packet, &e);
                delivery.abandoned = true;
                return;
            }
        }
        if !delivery.first_receiver {
            return;
        }

        self.trace(packet, now);

        let Some(role) = RequestRole::from_tag(packet.role) else {
            return;
        };
        match self.auth.authenticate(&mut self.store, packet.src, role, now) {
            Ok(decision) => {
                delivery.decision = Some(decision);
                if let Some(response) = decision.response() {
                    debug!(
                        sink_id = self.config.sink_id,
                        source = packet.src,
                        %decision,
                        %response,
                        "Answering source"
                    );
                    delivery.responses.push(self.respond(packet.src, response, now));
                }
            }
            Err(e) => {
                self.abandon(packet, &e);
                delivery.abandoned = true;
            }
        }
    }

    fn abandon(&mut self, packet: &Packet, err: &dyn std::fmt::Display) {
        self.store_failures += 1;
        warn!(
            sink_id = self.config.sink_id,
            source = packet.src,
            seq = packet.seq,
            error = %err,
            "Coordination store failed, skipping authentication"
        );
    }

    fn trace(&mut self, packet: &Packet, now: f64) {
        if !self.config.trace_enabled {
            return;
        }
        if let Some(tracer) = self.tracer.as_mut() {
            if let Err(e) = tracer.write(&TraceRecord::of(packet, now)) {
                warn!(sink_id = self.config.sink_id, error = %e, "Failed to write trace");
            }
        }
    }

    fn drop_packet(&mut self, packet: &Packet, reason: DropReason, now: f64) -> Reception {
        debug!(
            sink_id = self.config.sink_id,
            uid = packet.uid,
            source = packet.src,
            seq = packet.seq,
            %reason,
            "Dropped invalid packet"
        );
        if self.invalid_log.len() == MAX_INVALID_LOG {
            self.invalid_log.pop_front();
        }
        self.invalid_log.push_back(InvalidPacket {
            uid: packet.uid,
            src: packet.src,
            seq: packet.seq,
            reason,
            at: now,
        });
        Reception::Dropped(reason)
    }

    fn respond(&mut self, dst: NodeAddr, role: ResponseRole, now: f64) -> Packet {
        let size = self.auth.response_size(role);
        self.build_packet(dst, role.tag(), size, self.priority, now)
    }

    fn build_packet(&mut self, dst: NodeAddr, role: u32, size: u32, priority: Priority, now: f64) -> Packet {
        let uid = self.next_uid;
        self.next_uid += 1;
        let seq = self.next_tx_seq;
        self.next_tx_seq = self.next_tx_seq.wrapping_add(1);

        Packet {
            uid,
            ptype: PacketType::Cbr,
            size,
            timestamp: now,
            src: self.config.address,
            dst,
            dst_port: self.config.dest_port,
            seq,
            priority,
            role,
            rftt: self.last_ftt.filter(|ftt| *ftt >= 0.0),
        }
    }

    /// Build the next periodic packet.
    pub fn transmit(&mut self, now: f64) -> Packet {
        self.build_packet(
            self.config.dest_addr,
            self.config.traffic_role,
            self.config.packet_size,
            self.priority,
            now,
        )
    }

    /// Build one packet outside the periodic schedule, optionally with a
    /// one-off priority.
    pub fn send_packet(&mut self, priority: Option<Priority>, now: f64) -> Packet {
        let priority = priority.unwrap_or(self.priority);
        self.build_packet(
            self.config.dest_addr,
            self.config.traffic_role,
            self.config.packet_size,
            priority,
            now,
        )
    }

    /// Start (or restart) periodic traffic. Returns the first deadline.
    pub fn start(&mut self, now: f64) -> f64 {
        let deadline = self.timer.start(now, &mut self.rng);
        info!(sink_id = self.config.sink_id, deadline, "Periodic traffic started");
        deadline
    }

    /// Stop periodic traffic. Returns whether it was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.timer.stop();
        if was_running {
            info!(sink_id = self.config.sink_id, "Periodic traffic stopped");
        }
        was_running
    }

    /// Deadline of the next periodic packet, if running.
    pub fn next_transmission(&self) -> Option<f64> {
        self.timer.deadline()
    }

    /// Fire the timer if due, returning the periodic packet.
    pub fn on_timer(&mut self, now: f64) -> Option<Packet> {
        if self.timer.poll(now, &mut self.rng) {
            Some(self.transmit(now))
        } else {
            None
        }
    }

    /// Zero the reception statistics.
    pub fn reset_stats(&mut self) {
        info!(
            sink_id = self.config.sink_id,
            received = self.stats.received(),
            lost = self.stats.lost(),
            hrsn = self.tracker.highest(),
            sent = self.sent(),
            "Resetting statistics"
        );
        self.stats.reset();
        self.last_ftt = None;
    }

    /// Open `tracefile<suffix>.txt` in the configured trace directory.
    ///
    /// Returns `false`, leaving any current tracer alone, when tracing is
    /// disabled.
    pub fn set_trace(&mut self, suffix: &str, precision: Option<usize>) -> Result<bool> {
        if !self.config.trace_enabled {
            debug!(sink_id = self.config.sink_id, "Tracing disabled, ignoring trace suffix");
            return Ok(false);
        }
        self.tracer = Some(Tracer::open(&self.config.trace_dir, suffix, precision)?);
        Ok(true)
    }

    /// Trace into a caller-supplied tracer, enabling tracing.
    pub fn set_tracer(&mut self, tracer: Tracer) {
        self.config.trace_enabled = true;
        self.tracer = Some(tracer);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sink_id: self.config.sink_id,
            order_policy: self.config.order_policy,
            rtt: self.stats.rtt().mean(),
            rtt_std: self.stats.rtt().std_dev(),
            ftt: self.stats.ftt().mean(),
            ftt_std: self.stats.ftt().std_dev(),
            per: self.stats.per(),
            throughput: self.stats.throughput_bps(),
            sent: self.sent(),
            received: self.stats.received(),
            out_of_order: self.stats.out_of_order(),
            lost: self.stats.lost(),
            invalid: self.stats.invalid(),
            highest_seq: self.tracker.highest(),
            cross_cluster_handoffs: self.auth.cross_cluster_handoffs(),
            auth_requests_served: self.auth.auth_requests_served(),
            store_failures: self.store_failures,
        }
    }
}

impl std::fmt::Debug for SinkModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkModule")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .field("stats", &self.stats)
            .field("auth", &self.auth)
            .field("priority", &self.priority)
            .field("next_tx_seq", &self.next_tx_seq)
            .finish_non_exhaustive()
    }
}
