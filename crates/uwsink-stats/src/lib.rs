//! uwsink Reception Statistics
//!
//! Per-sink bookkeeping for inbound packets: sequence-number classification
//! (duplicates, reordering, loss) and running timing/throughput statistics.
//!
//! # Sequence Tracking
//!
//! A [`SequenceTracker`] keeps a sliding window of recently seen sequence
//! numbers and the highest received sequence number (`hrsn`). Each inbound
//! sequence number is classified against the expected next number
//! (`esn = hrsn + 1`) according to an [`OrderPolicy`]:
//!
//! - **DropDuplicates**: replays are rejected, reordering is tolerated
//! - **StrictOrder**: anything behind `esn` is discarded, gaps count as loss
//!
//! # Statistics
//!
//! [`ReceptionStats`] accumulates plain sums (no windowing, no decay). Means
//! and sample standard deviations are derived on read.
//!
//! Under `StrictOrder` the accounting keeps one invariant:
//!
//! ```text
//! received + lost + last_reset == hrsn
//! ```

mod sequence;
mod stats;
mod window;

pub use sequence::{Classification, OrderPolicy, SequenceTracker};
pub use stats::{ReceptionStats, TimingAccumulator};
pub use window::{SeenWindow, Sighting, WINDOW_SLOTS};

/// Sequence number carried in a packet header.
pub type SeqNo = u32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_order_pipeline_keeps_invariant() {
        let mut tracker = SequenceTracker::new(OrderPolicy::StrictOrder);
        let mut stats = ReceptionStats::new();

        for sn in [1, 2, 5, 4, 6, 10] {
            let class = tracker.classify(sn);
            if class.is_accepted() {
                stats.record_received();
                stats.record_lost(class.lost());
            } else {
                stats.record_out_of_order();
            }
            assert!(stats.loss_invariant_holds(tracker.highest()));
        }

        assert_eq!(stats.received(), 5);
        assert_eq!(stats.lost(), 5);
        assert_eq!(stats.out_of_order(), 1);
    }
}
