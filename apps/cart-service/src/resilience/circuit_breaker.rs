//! Circuit breaker guarding publishes to the broker.
//!
//! # State Machine
//!
//! ```text
//! CLOSED → OPEN (failure rate >= threshold over the sliding window)
//! OPEN → HALF_OPEN (wait duration elapsed)
//! HALF_OPEN → CLOSED (probe calls succeed)
//! HALF_OPEN → OPEN (a probe call fails)
//! ```

use std::collections::VecDeque;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected immediately.
    Open,
    /// A limited number of probe calls are admitted.
    HalfOpen,
}

impl std::fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate threshold to open the circuit (0.0-1.0).
    pub failure_rate_threshold: f64,
    /// Number of calls tracked in the sliding window.
    pub sliding_window_size: u32,
    /// Minimum calls observed before the failure rate is evaluated.
    pub minimum_calls: u32,
    /// Duration spent in `OPEN` before a half-open probe is admitted.
    pub wait_duration_in_open: Duration,
    /// Probe calls permitted in `HALF_OPEN`.
    pub permitted_calls_in_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::orders()
    }
}

impl CircuitBreakerConfig {
    /// Configuration for the `ORDERS` publish path: 50% failure rate over a
    /// window of 10, 30 s open duration, 3 probes.
    #[must_use]
    pub const fn orders() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_size: 10,
            minimum_calls: 5,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallOutcome {
    Success,
    Failure,
}

/// Circuit breaker wrapping a single resource (here: one broker publish path).
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: RwLock<CircuitBreakerState>,
    sliding_window: RwLock<VecDeque<CallOutcome>>,
    opened_at: RwLock<Option<Instant>>,
    half_open_calls: AtomicU32,
    half_open_successes: AtomicU32,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    state_transitions: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: RwLock::new(CircuitBreakerState::Closed),
            sliding_window: RwLock::new(VecDeque::new()),
            opened_at: RwLock::new(None),
            half_open_calls: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            state_transitions: AtomicU64::new(0),
        }
    }

    /// Service name, for logging/metrics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, after applying any pending time-based transition.
    #[must_use]
    pub fn state(&self) -> CircuitBreakerState {
        self.check_state_transition();
        *self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Whether a call should be allowed right now.
    #[must_use]
    pub fn is_call_permitted(&self) -> bool {
        self.check_state_transition();
        let state = *self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        match state {
            CircuitBreakerState::Closed => true,
            CircuitBreakerState::Open => false,
            CircuitBreakerState::HalfOpen => {
                self.half_open_calls.load(Ordering::Relaxed) < self.config.permitted_calls_in_half_open
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.record_outcome(CallOutcome::Success);
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        self.record_outcome(CallOutcome::Failure);
    }

    fn record_outcome(&self, outcome: CallOutcome) {
        let current_state = *self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        match current_state {
            CircuitBreakerState::Closed => {
                self.update_sliding_window(outcome);
                self.evaluate_closed_state();
            }
            CircuitBreakerState::HalfOpen => {
                self.half_open_calls.fetch_add(1, Ordering::Relaxed);
                if outcome == CallOutcome::Success {
                    self.half_open_successes.fetch_add(1, Ordering::Relaxed);
                }
                self.evaluate_half_open_state(outcome);
            }
            CircuitBreakerState::Open => {
                tracing::warn!(name = %self.name, "call recorded while circuit is OPEN");
            }
        }
    }

    fn update_sliding_window(&self, outcome: CallOutcome) {
        let mut window = self
            .sliding_window
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        window.push_back(outcome);
        while window.len() > self.config.sliding_window_size as usize {
            window.pop_front();
        }
    }

    fn evaluate_closed_state(&self) {
        let window = self
            .sliding_window
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if window.len() < self.config.minimum_calls as usize {
            return;
        }

        let failures = window.iter().filter(|o| **o == CallOutcome::Failure).count();
        let failure_rate = failures as f64 / window.len() as f64;

        if failure_rate >= self.config.failure_rate_threshold {
            drop(window);
            self.transition_to_open();
        }
    }

    fn evaluate_half_open_state(&self, outcome: CallOutcome) {
        if outcome == CallOutcome::Failure {
            self.transition_to_open();
            return;
        }

        let successes = self.half_open_successes.load(Ordering::Relaxed);
        if successes >= self.config.permitted_calls_in_half_open {
            self.transition_to_closed();
        }
    }

    fn check_state_transition(&self) {
        let state = *self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);

        if state == CircuitBreakerState::Open
            && let Some(opened) = *self.opened_at.read().unwrap_or_else(std::sync::PoisonError::into_inner)
            && opened.elapsed() >= self.config.wait_duration_in_open
        {
            self.transition_to_half_open();
        }
    }

    fn transition_to_open(&self) {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = *state;
        if previous != CircuitBreakerState::Open {
            *state = CircuitBreakerState::Open;
            drop(state);

            *self.opened_at.write().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Instant::now());
            self.state_transitions.fetch_add(1, Ordering::Relaxed);

            tracing::warn!(name = %self.name, from = %previous, to = "OPEN", "circuit breaker opened");
        }
    }

    fn transition_to_half_open(&self) {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = *state;
        if previous == CircuitBreakerState::Open {
            *state = CircuitBreakerState::HalfOpen;
            drop(state);

            self.half_open_calls.store(0, Ordering::Relaxed);
            self.half_open_successes.store(0, Ordering::Relaxed);
            self.state_transitions.fetch_add(1, Ordering::Relaxed);

            tracing::info!(name = %self.name, from = %previous, to = "HALF_OPEN", "circuit breaker probing");
        }
    }

    fn transition_to_closed(&self) {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = *state;
        if previous != CircuitBreakerState::Closed {
            *state = CircuitBreakerState::Closed;
            drop(state);

            self.sliding_window
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clear();
            *self.opened_at.write().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
            self.state_transitions.fetch_add(1, Ordering::Relaxed);

            tracing::info!(name = %self.name, from = %previous, to = "CLOSED", "circuit breaker closed");
        }
    }

    /// Snapshot metrics for this breaker.
    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            name: self.name.clone(),
            state: self.state(),
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            state_transitions: self.state_transitions.load(Ordering::Relaxed),
            failure_rate: self.current_failure_rate(),
        }
    }

    fn current_failure_rate(&self) -> f64 {
        let window = self
            .sliding_window
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if window.is_empty() {
            return 0.0;
        }
        let failures = window.iter().filter(|o| **o == CallOutcome::Failure).count();
        failures as f64 / window.len() as f64
    }

    /// Force the circuit open. Test/emergency use only.
    pub fn force_open(&self) {
        self.transition_to_open();
    }

    /// Force the circuit closed. Test/recovery use only.
    pub fn force_close(&self) {
        self.transition_to_closed();
    }
}

/// Point-in-time snapshot of a circuit breaker's counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Name of the guarded resource.
    pub name: String,
    /// Current state.
    pub state: CircuitBreakerState,
    /// Total calls observed.
    pub total_calls: u64,
    /// Total failures observed.
    pub total_failures: u64,
    /// Number of state transitions so far.
    pub state_transitions: u64,
    /// Failure rate within the current sliding window.
    pub failure_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new("orders-broker", CircuitBreakerConfig::orders())
    }

    #[test]
    fn starts_closed_and_permits_calls() {
        let cb = breaker();
        assert_eq!(cb.state(), CircuitBreakerState::Closed);
        assert!(cb.is_call_permitted());
    }

    #[test]
    fn opens_after_failure_rate_threshold_reached() {
        let cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitBreakerState::Closed);
        // fifth call reaches minimum_calls with 100% failures in the window
        cb.record_failure();
        assert_eq!(cb.state(), CircuitBreakerState::Open);
        assert!(!cb.is_call_permitted());
    }

    #[test]
    fn half_open_probe_success_closes_circuit() {
        let cb = breaker();
        cb.force_open();
        assert_eq!(cb.state(), CircuitBreakerState::Open);

        // Simulate elapsed wait duration by forcing half-open transition directly.
        cb.transition_to_half_open_for_test();
        assert_eq!(cb.state(), CircuitBreakerState::HalfOpen);

        for _ in 0..3 {
            cb.record_success();
        }
        assert_eq!(cb.state(), CircuitBreakerState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens_circuit() {
        let cb = breaker();
        cb.force_open();
        cb.transition_to_half_open_for_test();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitBreakerState::Open);
    }

    impl CircuitBreaker {
        fn transition_to_half_open_for_test(&self) {
            let mut state = self.state.write().unwrap();
            *state = CircuitBreakerState::HalfOpen;
        }
    }
}
