//! Multi-sink scenarios over one shared store.

use uwsink_auth::{tags, AuthConfig, Decision};
use uwsink_node::{Packet, SinkConfig, SinkModule};
use uwsink_stats::OrderPolicy;
use uwsink_store::{MemoryStore, RecordKey};

const SOURCE: u32 = 1;

fn sink(store: &MemoryStore, sink_id: u32, key_expiry: f64) -> SinkModule {
    let config = SinkConfig::default()
        .with_sink_id(sink_id)
        .with_address(1000 + sink_id)
        .with_auth(AuthConfig::default().with_key_expiry(key_expiry))
        .with_seed(u64::from(sink_id));
    SinkModule::new(config, Box::new(store.clone())).unwrap()
}

fn packet(seq: u32, role: u32, timestamp: f64) -> Packet {
    Packet::cbr(SOURCE, 0, seq, role, 125, timestamp)
}

#[test]
fn exactly_one_first_receiver() {
    let store = MemoryStore::new();
    let mut sinks: Vec<SinkModule> = (1..=6).map(|id| sink(&store, id, 30.0)).collect();

    for seq in 1..=20 {
        let p = packet(seq, tags::DATA_AUTH_CHECK, 0.0);
        let mut winners = 0;
        for s in sinks.iter_mut() {
            if s.receive(&p, 1.0).delivery().unwrap().first_receiver {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "seq {}", seq);
    }

    for s in &sinks {
        assert_eq!(s.stats().received(), 20);
    }
}

#[test]
fn end_to_end_grant_then_silence() {
    let store = MemoryStore::new();
    let mut sink = sink(&store, 7, 30.0);

    let first = sink.receive(&packet(1, tags::AUTH_REQUEST, 0.0), 0.5);
    assert_eq!(first.responses().len(), 1);
    assert_eq!(first.responses()[0].role, tags::AUTH_GRANT);

    let second = sink.receive(&packet(2, tags::DATA_AUTH_CHECK, 1.0), 1.5);
    assert_eq!(second.delivery().unwrap().decision, Some(Decision::Owned));
    assert!(second.responses().is_empty());

    let snap = sink.snapshot();
    assert_eq!(snap.received, 2);
    assert_eq!(snap.auth_requests_served, 1);
    assert_eq!(snap.cross_cluster_handoffs, 0);
    assert_eq!(
        store.get(&RecordKey::FirstReceiver { source: SOURCE, seq: 1 }).as_deref(),
        Some("7")
    );
}

#[test]
fn credential_expires() {
    let store = MemoryStore::new();
    let mut sink = sink(&store, 7, 10.0);

    sink.receive(&packet(1, tags::AUTH_REQUEST, 0.0), 0.0);

    let fresh = sink.receive(&packet(2, tags::DATA_AUTH_CHECK, 5.0), 5.0);
    assert!(fresh.responses().is_empty());

    let stale = sink.receive(&packet(3, tags::DATA_AUTH_CHECK, 11.0), 11.0);
    assert_eq!(stale.delivery().unwrap().decision, Some(Decision::Expired));
    assert_eq!(stale.responses()[0].role, tags::REAUTH_CHALLENGE);
}

#[test]
fn roaming_source_hands_off() {
    let store = MemoryStore::new();
    let mut home = sink(&store, 1, 60.0);
    let mut visited = sink(&store, 2, 60.0);

    home.receive(&packet(1, tags::AUTH_REQUEST, 0.0), 0.0);

    // Data reaches the visited sink before any hand-off.
    let challenged = visited.receive(&packet(2, tags::DATA_AUTH_CHECK, 1.0), 1.0);
    assert_eq!(challenged.responses()[0].role, tags::HANDOFF_CHALLENGE);

    let acked = visited.receive(&packet(3, tags::HANDOFF_REAUTH_REQUEST, 2.0), 2.0);
    assert_eq!(acked.responses()[0].role, tags::REAUTH_ACK);

    let quiet = visited.receive(&packet(4, tags::DATA_AUTH_CHECK, 3.0), 3.0);
    assert_eq!(quiet.delivery().unwrap().decision, Some(Decision::HandedOff));
    assert!(quiet.responses().is_empty());

    assert_eq!(visited.snapshot().cross_cluster_handoffs, 3);
    assert_eq!(home.snapshot().cross_cluster_handoffs, 0);
}

#[test]
fn unreachable_store_updates_statistics_only() {
    let store = MemoryStore::new();
    let mut sink = sink(&store, 7, 30.0);
    store.set_reachable(false);

    for seq in 1..=3 {
        let reception = sink.receive(&packet(seq, tags::AUTH_REQUEST, 0.0), 1.0);
        assert!(reception.responses().is_empty());
        assert!(reception.delivery().unwrap().abandoned);
    }

    let snap = sink.snapshot();
    assert_eq!(snap.received, 3);
    assert_eq!(snap.store_failures, 3);
    assert_eq!(snap.auth_requests_served, 0);
    assert_eq!(snap.sent, 0);
}

#[test]
fn strict_order_loss_accounting() {
    let store = MemoryStore::new();
    let config = SinkConfig::default()
        .with_sink_id(9)
        .with_order_policy(OrderPolicy::StrictOrder)
        .with_seed(9);
    let mut sink = SinkModule::new(config, Box::new(store.clone())).unwrap();

    for seq in [1, 2, 5, 4, 6, 6, 10] {
        sink.receive(&packet(seq, 0, 0.0), 1.0);
    }

    let snap = sink.snapshot();
    assert_eq!(snap.received, 5);
    assert_eq!(snap.lost, 5);
    // Under strict ordering a repeat is just another late packet.
    assert_eq!(snap.out_of_order, 2);
    assert_eq!(snap.invalid, 0);
    assert_eq!(snap.highest_seq, 10);
    assert!(sink.stats().loss_invariant_holds(10));
}
