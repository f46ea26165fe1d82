//! Exponential backoff with jitter for broker retries.
//!
//! `PublishEngine` lets the underlying `rdkafka` client retry internally
//! within the delivery-timeout budget; this calculator drives the engine's
//! own retry loop around DLT/file-fallback attempts and, in the connectivity
//! monitor, the unhealthy-state re-probe cadence.

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
    /// Publish-side retry budget used by `PublishEngine` (spec §4.7): broker
    /// client retry starts at ~100ms within the delivery-timeout window.
    #[must_use]
    pub const fn publish() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(8),
            backoff_multiplier: 2.0,
            jitter_factor: 0.2,
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
