//! Periodic traffic generation.

use rand::Rng;

use crate::error::{Error, Result};

/// Inter-transmission interval distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrafficPattern {
    /// Fixed interval of `period` seconds.
    Constant { period: f64 },
    /// Exponential intervals with mean `period` seconds.
    Poisson { period: f64 },
}

impl TrafficPattern {
    pub fn new(period: f64, poisson: bool) -> Result<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "transmission period must be positive, got {}",
                period
            )));
        }
        Ok(if poisson {
            Self::Poisson { period }
        } else {
            Self::Constant { period }
        })
    }

    pub fn period(&self) -> f64 {
        match self {
            Self::Constant { period } | Self::Poisson { period } => *period,
        }
    }

    /// Draw the delay before the next transmission.
    pub fn next_interval<R: Rng>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Constant { period } => *period,
            Self::Poisson { period } => {
                // (0, 1] so the log is finite
                let u: f64 = 1.0 - rng.gen::<f64>();
                -u.ln() * period
            }
        }
    }
}

/// Single-deadline timer driving periodic transmissions.
///
/// At most one deadline is pending. Restarting replaces it, stopping cancels
/// it, and a deadline fires at most once.
#[derive(Debug, Clone)]
pub struct TrafficTimer {
    pattern: TrafficPattern,
    deadline: Option<f64>,
}

impl TrafficTimer {
    pub fn new(pattern: TrafficPattern) -> Self {
        Self {
            pattern,
            deadline: None,
        }
    }

    pub fn pattern(&self) -> TrafficPattern {
        self.pattern
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Arm the timer one interval from `now`. Returns the new deadline.
    pub fn start<R: Rng>(&mut self, now: f64, rng: &mut R) -> f64 {
        let deadline = now + self.pattern.next_interval(rng);
        self.deadline = Some(deadline);
        deadline
    }

    /// Cancel the pending deadline. Returns whether one was pending.
    pub fn stop(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Fire if the deadline has passed, re-arming for the next interval.
    pub fn poll<R: Rng>(&mut self, now: f64, rng: &mut R) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = Some(now + self.pattern.next_interval(rng));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn constant_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let pattern = TrafficPattern::new(2.0, false).unwrap();
        assert_eq!(pattern.next_interval(&mut rng), 2.0);
    }

    #[test]
    fn poisson_mean_close_to_period() {
        let mut rng = StdRng::seed_from_u64(7);
        let pattern = TrafficPattern::new(4.0, true).unwrap();
        let n = 20_000;
        let total: f64 = (0..n).map(|_| pattern.next_interval(&mut rng)).sum();
        let mean = total / n as f64;
        assert!((mean - 4.0).abs() < 0.2, "mean {}", mean);
    }

    #[test]
    fn poisson_intervals_positive_and_finite() {
        let mut rng = StdRng::seed_from_u64(3);
        let pattern = TrafficPattern::new(1.0, true).unwrap();
        for _ in 0..1000 {
            let dt = pattern.next_interval(&mut rng);
            assert!(dt.is_finite() && dt >= 0.0);
        }
    }

    #[test]
    fn rejects_bad_period() {
        assert!(TrafficPattern::new(0.0, false).is_err());
        assert!(TrafficPattern::new(-3.0, true).is_err());
        assert!(TrafficPattern::new(f64::NAN, false).is_err());
    }

    #[test]
    fn fires_once_per_deadline() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut timer = TrafficTimer::new(TrafficPattern::new(10.0, false).unwrap());
        assert!(!timer.poll(100.0, &mut rng));

        assert_eq!(timer.start(0.0, &mut rng), 10.0);
        assert!(!timer.poll(9.9, &mut rng));
        assert!(timer.poll(10.0, &mut rng));
        assert!(!timer.poll(10.0, &mut rng));
        assert_eq!(timer.deadline(), Some(20.0));
    }

    #[test]
    fn restart_replaces_deadline() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut timer = TrafficTimer::new(TrafficPattern::new(10.0, false).unwrap());
        timer.start(0.0, &mut rng);
        timer.start(5.0, &mut rng);
        assert!(!timer.poll(10.0, &mut rng));
        assert!(timer.poll(15.0, &mut rng));
    }

    #[test]
    fn stop_cancels() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut timer = TrafficTimer::new(TrafficPattern::new(1.0, false).unwrap());
        timer.start(0.0, &mut rng);
        assert!(timer.stop());
        assert!(!timer.stop());
        assert!(!timer.poll(50.0, &mut rng));
        assert!(!timer.is_running());
    }
}
