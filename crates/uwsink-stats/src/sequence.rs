//! Sequence-number classification for inbound packets.

use crate::window::{SeenWindow, Sighting};
use crate::SeqNo;

/// How the tracker treats packets that arrive behind the expected number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OrderPolicy {
    /// Reject replays, keep reordered packets. No loss accounting.
    #[default]
    DropDuplicates,
    /// Discard anything behind the expected number, count gaps as loss.
    StrictOrder,
}

/// Outcome of classifying one sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Already seen (or too old to tell). Drop.
    Duplicate,
    /// At or ahead of the expected number. `lost` is the gap under
    /// [`OrderPolicy::StrictOrder`], always 0 otherwise.
    InOrder { lost: u64 },
    /// Behind the expected number under strict ordering. Drop.
    OutOfOrderDiscard,
    /// Behind the expected number but kept.
    OutOfOrderKeep,
}

impl Classification {
    /// Whether the packet continues down the pipeline.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::InOrder { .. } | Self::OutOfOrderKeep)
    }

    /// Packets reported lost by this classification.
    pub fn lost(&self) -> u64 {
        match self {
            Self::InOrder { lost } => *lost,
            _ => 0,
        }
    }
}

/// Tracks the highest received sequence number and recently seen numbers.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    policy: OrderPolicy,
    window: SeenWindow,
    highest: SeqNo,
}

impl SequenceTracker {
    /// Create a tracker that has seen nothing (`hrsn = 0`).
    pub fn new(policy: OrderPolicy) -> Self {
        Self {
            policy,
            window: SeenWindow::new(),
            highest: 0,
        }
    }

    /// The policy this tracker was created with.
    pub fn policy(&self) -> OrderPolicy {
        self.policy
    }

    /// Highest received sequence number (`hrsn`).
    ///
    /// This is the latest accepted number, not the highest contiguous one:
    /// a kept out-of-order packet moves it backwards.
    pub fn highest(&self) -> SeqNo {
        self.highest
    }

    /// Expected next sequence number (`esn = hrsn + 1`).
    pub fn expected(&self) -> u64 {
        u64::from(self.highest) + 1
    }

    /// Classify `sn` and update tracker state.
    pub fn classify(&mut self, sn: SeqNo) -> Classification {
        let expected = self.expected();

        if self.policy == OrderPolicy::DropDuplicates && self.window.check(sn) != Sighting::Fresh {
            return Classification::Duplicate;
        }
        self.window.mark(sn);

        let sn_wide = u64::from(sn);
        if sn_wide < expected {
            return match self.policy {
                OrderPolicy::StrictOrder => Classification::OutOfOrderDiscard,
                OrderPolicy::DropDuplicates => {
                    self.highest = sn;
                    Classification::OutOfOrderKeep
                }
            };
        }

        let lost = match self.policy {
            OrderPolicy::StrictOrder => sn_wide - expected,
            OrderPolicy::DropDuplicates => 0,
        };
        self.highest = sn;
        Classification::InOrder { lost }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WINDOW_SLOTS;
    use proptest::prelude::*;

    #[test]
    fn in_order_stream() {
        let mut tracker = SequenceTracker::new(OrderPolicy::DropDuplicates);
        for sn in 1..=5 {
            assert_eq!(tracker.classify(sn), Classification::InOrder { lost: 0 });
        }
        assert_eq!(tracker.highest(), 5);
        assert_eq!(tracker.expected(), 6);
    }

    #[test]
    fn duplicates_rejected() {
        let mut tracker = SequenceTracker::new(OrderPolicy::DropDuplicates);
        tracker.classify(1);
        tracker.classify(2);

        assert_eq!(tracker.classify(1), Classification::Duplicate);
        assert_eq!(tracker.classify(2), Classification::Duplicate);
        assert_eq!(tracker.highest(), 2);
    }

    #[test]
    fn reordering_kept_and_moves_hrsn_back() {
        let mut tracker = SequenceTracker::new(OrderPolicy::DropDuplicates);
        tracker.classify(1);
        tracker.classify(4);

        assert_eq!(tracker.classify(2), Classification::OutOfOrderKeep);
        assert_eq!(tracker.highest(), 2);
        // 4 is still remembered after hrsn moved back
        assert_eq!(tracker.classify(4), Classification::Duplicate);
    }

    #[test]
    fn gap_counts_as_loss_under_strict_order() {
        let mut tracker = SequenceTracker::new(OrderPolicy::StrictOrder);
        assert_eq!(tracker.classify(1), Classification::InOrder { lost: 0 });
        assert_eq!(tracker.classify(5), Classification::InOrder { lost: 3 });
        assert_eq!(tracker.highest(), 5);
    }

    #[test]
    fn late_packets_discarded_under_strict_order() {
        let mut tracker = SequenceTracker::new(OrderPolicy::StrictOrder);
        tracker.classify(1);
        tracker.classify(3);

        assert_eq!(tracker.classify(2), Classification::OutOfOrderDiscard);
        // Replay of the last one is behind esn too
        assert_eq!(tracker.classify(3), Classification::OutOfOrderDiscard);
        assert_eq!(tracker.highest(), 3);
    }

    #[test]
    fn no_loss_accounting_without_strict_order() {
        let mut tracker = SequenceTracker::new(OrderPolicy::DropDuplicates);
        tracker.classify(1);
        assert_eq!(tracker.classify(100), Classification::InOrder { lost: 0 });
    }

    #[test]
    fn stale_numbers_treated_as_duplicates() {
        let mut tracker = SequenceTracker::new(OrderPolicy::DropDuplicates);
        tracker.classify(WINDOW_SLOTS + 10);
        assert_eq!(tracker.classify(3), Classification::Duplicate);
    }

    #[test]
    fn classification_helpers() {
        assert!(Classification::InOrder { lost: 2 }.is_accepted());
        assert!(Classification::OutOfOrderKeep.is_accepted());
        assert!(!Classification::Duplicate.is_accepted());
        assert!(!Classification::OutOfOrderDiscard.is_accepted());
        assert_eq!(Classification::InOrder { lost: 2 }.lost(), 2);
        assert_eq!(Classification::OutOfOrderKeep.lost(), 0);
    }

    proptest! {
        #[test]
        fn replay_is_always_duplicate(sns in prop::collection::vec(0u32..60_000, 1..200)) {
            let mut tracker = SequenceTracker::new(OrderPolicy::DropDuplicates);
            for &sn in &sns {
                tracker.classify(sn);
            }
            for &sn in &sns {
                prop_assert_eq!(tracker.classify(sn), Classification::Duplicate);
            }
        }

        #[test]
        fn strict_order_never_accepts_behind_expected(sns in prop::collection::vec(1u32..5_000, 1..200)) {
            let mut tracker = SequenceTracker::new(OrderPolicy::StrictOrder);
            let mut last_accepted = 0u32;
            for sn in sns {
                let class = tracker.classify(sn);
                if class.is_accepted() {
                    prop_assert!(sn > last_accepted);
                    last_accepted = sn;
                }
                prop_assert_eq!(tracker.highest(), last_accepted);
            }
        }
    }
}
