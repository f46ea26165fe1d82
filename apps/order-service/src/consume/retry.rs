//! Exponential backoff for the consumer's retry-with-DLT wrapper and the
//! connectivity monitor's unhealthy-state re-probe cadence.
//!
//! Mirrors `cart_service::broker::retry` (spec §4.6/§4.8 share the same
//! backoff shape, just different numbers).

use std::time::Duration;

use rand::Rng;

/// Backoff policy: initial delay, growth factor, cap, and max attempts.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration (cap).
    pub max_backoff: Duration,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,
    /// Jitter factor, e.g. 0.2 = ±20%.
    pub jitter_factor: f64,
}

impl BackoffPolicy {
    /// `ConsumeEngine`'s retry-with-DLT budget (spec §4.8): 1s initial, ×2,
    /// capped at 10s, max 3 retries.
    #[must_use]
    pub const fn consume_retry(max_retries: u32, initial: Duration, cap: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_retries,
            initial_backoff: initial,
            max_backoff: cap,
            backoff_multiplier: multiplier,
            jitter_factor: 0.1,
        }
    }

    /// Connectivity-monitor unhealthy-state re-probe cadence (spec §4.6):
    /// 100ms initial, doubling, capped at 5s, retried forever by the caller.
    #[must_use]
    pub const fn connectivity_unhealthy() -> Self {
        Self {
            max_attempts: u32::MAX,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Stateful calculator producing successive backoff durations.
#[derive(Debug)]
pub struct ExponentialBackoffCalculator {
    current_attempt: u32,
    max_attempts: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    backoff_multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoffCalculator {
    /// Build a calculator from a policy.
    #[must_use]
    pub fn new(policy: &BackoffPolicy) -> Self {
        Self {
            current_attempt: 0,
            max_attempts: policy.max_attempts,
            initial_backoff_ms: u64::try_from(policy.initial_backoff.as_millis()).unwrap_or(u64::MAX),
            max_backoff_ms: u64::try_from(policy.max_backoff.as_millis()).unwrap_or(u64::MAX),
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
        }
    }

    /// Next backoff duration, or `None` if max attempts exceeded.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }

        let base_ms = self.calculate_base_backoff_ms();
        let jittered_ms = self.apply_jitter(base_ms);
        let capped_ms = jittered_ms.min(self.max_backoff_ms);

        self.current_attempt += 1;
        Some(Duration::from_millis(capped_ms))
    }

    fn calculate_base_backoff_ms(&self) -> u64 {
        let multiplier = self.backoff_multiplier.powi(self.current_attempt as i32);
        let backoff = (self.initial_backoff_ms as f64 * multiplier) as u64;
        backoff.min(self.max_backoff_ms)
    }

    fn apply_jitter(&self, backoff_ms: u64) -> u64 {
        let mut rng = rand::rng();
        let jitter_range = backoff_ms as f64 * self.jitter_factor;
        let min = (backoff_ms as f64 - jitter_range).max(0.0);
        let max = backoff_ms as f64 + jitter_range;
        rng.random_range(min..=max) as u64
    }

    /// Current attempt number (0-based).
    #[must_use]
    pub const fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Whether more retries remain.
    #[must_use]
    pub const fn has_remaining_attempts(&self) -> bool {
        self.current_attempt < self.max_attempts
    }

    /// Reset for a fresh sequence of attempts.
    pub const fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy::consume_retry(3, Duration::from_millis(10), Duration::from_millis(100), 2.0)
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let mut backoff = ExponentialBackoffCalculator::new(&policy());
        for _ in 0..3 {
            assert!(backoff.next_backoff().is_some());
        }
        assert!(backoff.next_backoff().is_none());
    }

    #[test]
    fn durations_stay_within_cap() {
        let mut backoff = ExponentialBackoffCalculator::new(&policy());
        for _ in 0..3 {
            let d = backoff.next_backoff().unwrap();
            assert!(d <= Duration::from_millis(100));
        }
    }

    #[test]
    fn reset_restarts_attempt_counter() {
        let mut backoff = ExponentialBackoffCalculator::new(&policy());
        backoff.next_backoff();
        assert_eq!(backoff.current_attempt(), 1);
        backoff.reset();
        assert_eq!(backoff.current_attempt(), 0);
        assert!(backoff.has_remaining_attempts());
    }
}
