//! Running reception statistics.

use crate::SeqNo;

/// Sum, sum of squares and sample count of a timing series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingAccumulator {
    sum: f64,
    sum_sq: f64,
    samples: u64,
}

impl TimingAccumulator {
    /// Create an empty accumulator.
    pub const fn new() -> Self {
        Self {
            sum: 0.0,
            sum_sq: 0.0,
            samples: 0,
        }
    }

    /// Add one sample.
    pub fn record(&mut self, sample: f64) {
        self.sum += sample;
        self.sum_sq += sample * sample;
        self.samples += 1;
    }

    /// Number of samples recorded.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Sum of all samples.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Arithmetic mean, 0 without samples.
    pub fn mean(&self) -> f64 {
        if self.samples > 0 {
            self.sum / self.samples as f64
        } else {
            0.0
        }
    }

    /// Unbiased sample standard deviation.
    ///
    /// 0 with fewer than two samples, and 0 when rounding drives the variance
    /// estimate to zero or below.
    pub fn std_dev(&self) -> f64 {
        if self.samples < 2 {
            return 0.0;
        }
        let n = self.samples as f64;
        let variance = (self.sum_sq - self.sum * self.sum / n) / (n - 1.0);
        if variance > 0.0 {
            variance.sqrt()
        } else {
            0.0
        }
    }
}

/// Counters and accumulators of one sink's reception path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceptionStats {
    received: u64,
    out_of_order: u64,
    lost: u64,
    invalid: u64,
    /// `received + lost` carried over from before the last reset.
    last_reset: u64,
    rtt: TimingAccumulator,
    ftt: TimingAccumulator,
    bytes: u64,
    elapsed: f64,
}

impl ReceptionStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&mut self) {
        self.received += 1;
    }

    pub fn record_out_of_order(&mut self) {
        self.out_of_order += 1;
    }

    pub fn record_invalid(&mut self) {
        self.invalid += 1;
    }

    pub fn record_lost(&mut self, packets: u64) {
        self.lost += packets;
    }

    pub fn record_rtt(&mut self, sample: f64) {
        self.rtt.record(sample);
    }

    pub fn record_ftt(&mut self, sample: f64) {
        self.ftt.record(sample);
    }

    /// Account `bytes` received over `elapsed` seconds.
    pub fn record_throughput(&mut self, bytes: u64, elapsed: f64) {
        self.bytes += bytes;
        self.elapsed += elapsed;
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn out_of_order(&self) -> u64 {
        self.out_of_order
    }

    pub fn lost(&self) -> u64 {
        self.lost
    }

    pub fn invalid(&self) -> u64 {
        self.invalid
    }

    pub fn last_reset(&self) -> u64 {
        self.last_reset
    }

    pub fn rtt(&self) -> &TimingAccumulator {
        &self.rtt
    }

    pub fn ftt(&self) -> &TimingAccumulator {
        &self.ftt
    }

    /// Packet error rate: `lost / (received + lost)`, 0 when nothing counted.
    pub fn per(&self) -> f64 {
        let total = self.received + self.lost;
        if total > 0 {
            self.lost as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Throughput in bits per second of simulation time.
    pub fn throughput_bps(&self) -> f64 {
        if self.elapsed != 0.0 {
            self.bytes as f64 * 8.0 / self.elapsed
        } else {
            0.0
        }
    }

    /// Zero the reception counters and accumulators.
    ///
    /// `received + lost` moves into the reset offset so that the
    /// strict-order invariant stays checkable. The invalid counter is kept.
    pub fn reset(&mut self) {
        self.last_reset += self.received + self.lost;
        self.received = 0;
        self.out_of_order = 0;
        self.lost = 0;
        self.rtt = TimingAccumulator::new();
        self.ftt = TimingAccumulator::new();
        self.bytes = 0;
        self.elapsed = 0.0;
    }

    /// `received + lost + last_reset == hrsn`; only meaningful under strict
    /// ordering.
    pub fn loss_invariant_holds(&self, highest: SeqNo) -> bool {
        self.received + self.lost + self.last_reset == u64::from(highest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrderPolicy, SequenceTracker};
    use proptest::prelude::*;

    #[test]
    fn mean_and_std_dev() {
        let mut acc = TimingAccumulator::new();
        for sample in [10.0, 20.0, 30.0] {
            acc.record(sample);
        }
        assert_eq!(acc.samples(), 3);
        assert!((acc.mean() - 20.0).abs() < 1e-9);
        assert!((acc.std_dev() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_accumulator_is_zero() {
        let acc = TimingAccumulator::new();
        assert_eq!(acc.mean(), 0.0);
        assert_eq!(acc.std_dev(), 0.0);
    }

    #[test]
    fn single_sample_has_no_spread() {
        let mut acc = TimingAccumulator::new();
        acc.record(4.2);
        assert_eq!(acc.std_dev(), 0.0);
        assert!((acc.mean() - 4.2).abs() < 1e-12);
    }

    #[test]
    fn constant_series_never_nan() {
        let mut acc = TimingAccumulator::new();
        for _ in 0..1000 {
            acc.record(0.1);
        }
        let std = acc.std_dev();
        assert!(!std.is_nan());
        assert!((0.0..1e-6).contains(&std));
    }

    #[test]
    fn per_and_throughput() {
        let mut stats = ReceptionStats::new();
        assert_eq!(stats.per(), 0.0);
        assert_eq!(stats.throughput_bps(), 0.0);

        for _ in 0..3 {
            stats.record_received();
        }
        stats.record_lost(1);
        stats.record_throughput(100, 2.0);
        stats.record_throughput(100, 2.0);

        assert!((stats.per() - 0.25).abs() < 1e-12);
        // 200 bytes over 4 s
        assert!((stats.throughput_bps() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn reset_keeps_offset_and_invalid() {
        let mut stats = ReceptionStats::new();
        stats.record_received();
        stats.record_received();
        stats.record_lost(3);
        stats.record_invalid();
        stats.record_out_of_order();
        stats.record_rtt(1.0);
        stats.record_ftt(0.5);
        stats.record_throughput(10, 1.0);

        stats.reset();

        assert_eq!(stats.received(), 0);
        assert_eq!(stats.lost(), 0);
        assert_eq!(stats.out_of_order(), 0);
        assert_eq!(stats.invalid(), 1);
        assert_eq!(stats.last_reset(), 5);
        assert_eq!(stats.rtt().samples(), 0);
        assert_eq!(stats.ftt().samples(), 0);
        assert_eq!(stats.throughput_bps(), 0.0);
        assert!(stats.loss_invariant_holds(5));
    }

    proptest! {
        #[test]
        fn strict_order_accounting_matches_hrsn(
            sns in prop::collection::vec(1u32..10_000, 1..300),
            reset_at in 0usize..300,
        ) {
            let mut tracker = SequenceTracker::new(OrderPolicy::StrictOrder);
            let mut stats = ReceptionStats::new();

            for (i, sn) in sns.into_iter().enumerate() {
                if i == reset_at {
                    stats.reset();
                }
                let class = tracker.classify(sn);
                if class.is_accepted() {
                    stats.record_received();
                    stats.record_lost(class.lost());
                } else {
                    stats.record_out_of_order();
                }
                prop_assert!(stats.loss_invariant_holds(tracker.highest()));
            }
        }
    }
}
