//! Jittered exponential backoff for reconnection attempts.

use rand::Rng;
use std::time::Duration;

/// Backoff delay policy.
///
/// The delay ceiling grows from `min_delay` to `max_delay` as the failure
/// count approaches `saturation_failures` and stays at `max_delay`
/// afterwards. Each delay is drawn uniformly between `min_delay` and the
/// ceiling so many agents reconnecting at once do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    min_delay: Duration,
    max_delay: Duration,
    saturation_failures: u32,
}

impl BackoffPolicy {
    pub fn new(min_delay: Duration, max_delay: Duration, saturation_failures: u32) -> Self {
        let max_delay = max_delay.max(min_delay);
        Self {
            min_delay,
            max_delay,
            saturation_failures: saturation_failures.max(1),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn saturation_failures(&self) -> u32 {
        self.saturation_failures
    }

    /// Upper bound of the delay after `failures` consecutive failures.
    pub fn ceiling(&self, failures: u32) -> Duration {
        let min_ms = self.min_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let steps = u64::from(failures.min(self.saturation_failures));
        let span = max_ms - min_ms;
        let grown = span.saturating_mul(steps) / u64::from(self.saturation_failures);
        Duration::from_millis(min_ms + grown)
    }

    /// Jittered delay before the next attempt.
    pub fn delay(&self, failures: u32) -> Duration {
        self.delay_with(failures, &mut rand::thread_rng())
    }

    pub fn delay_with<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        let low = self.min_delay.as_millis() as u64;
        let high = self.ceiling(failures).as_millis() as u64;
        if high <= low {
            return Duration::from_millis(low);
        }
        Duration::from_millis(rng.gen_range(low..=high))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(5_000), Duration::from_millis(60_000), 10)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_policy() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.min_delay(), Duration::from_millis(5_000));
        assert_eq!(policy.max_delay(), Duration::from_millis(60_000));
        assert_eq!(policy.saturation_failures(), 10);
    }

    #[test]
    fn test_ceiling_grows_then_saturates() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.ceiling(0), Duration::from_millis(5_000));
        assert_eq!(policy.ceiling(1), Duration::from_millis(10_500));
        assert_eq!(policy.ceiling(5), Duration::from_millis(32_500));
        assert_eq!(policy.ceiling(10), Duration::from_millis(60_000));
        assert_eq!(policy.ceiling(11), Duration::from_millis(60_000));
        assert_eq!(policy.ceiling(u32::MAX), Duration::from_millis(60_000));
    }

    #[test]
    fn test_ceiling_is_non_decreasing() {
        let policy = BackoffPolicy::default();
        let mut previous = Duration::ZERO;
        for failures in 0..=25 {
            let ceiling = policy.ceiling(failures);
            assert!(ceiling >= previous, "ceiling dropped at {}", failures);
            previous = ceiling;
        }
    }

    #[test]
    fn test_delay_stays_within_bounds() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for failures in 0..40 {
            for _ in 0..50 {
                let delay = policy.delay_with(failures, &mut rng);
                assert!(delay >= policy.min_delay());
                assert!(delay <= policy.ceiling(failures));
                assert!(delay <= Duration::from_millis(60_000));
            }
        }
    }

    #[test]
    fn test_delay_is_jittered() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(42);
        let samples: Vec<Duration> = (0..20).map(|_| policy.delay_with(10, &mut rng)).collect();
        assert!(samples.iter().any(|d| *d != samples[0]));
    }

    #[test]
    fn test_inverted_bounds_are_clamped() {
        let policy = BackoffPolicy::new(Duration::from_secs(10), Duration::from_secs(1), 0);
        assert_eq!(policy.max_delay(), Duration::from_secs(10));
        assert_eq!(policy.saturation_failures(), 1);
        assert_eq!(policy.delay(3), Duration::from_secs(10));
    }
}
