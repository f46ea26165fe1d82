//! HealthReporter (C11), producer instantiation.
//!
//! Synthesizes liveness/readiness from three sub-checks: `service` (always
//! UP if this code is running), `broker` (`ConnectivityMonitor::ping_now`),
//! and `state` (store read accessibility). Grounded on the teacher's
//! `/health` handler composing a JSON status from sub-checks.

use std::sync::Arc;

use serde::Serialize;

use crate::broker::ConnectivityMonitor;
use crate::domain::OrderStore;

/// Status of a single sub-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// The sub-check passed.
    Up,
    /// The broker is reachable but the topic is momentarily not ready.
    Degraded,
    /// The sub-check failed.
    Down,
}

/// A liveness or readiness report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: CheckStatus,
    /// Component-internal check; always UP if the process is responsive.
    pub service: CheckStatus,
    /// Broker connectivity check.
    pub broker: CheckStatus,
    /// Local store read-accessibility check.
    pub state: CheckStatus,
}

/// Synthesizes liveness/readiness reports from the sub-checks above.
pub struct HealthReporter {
    connectivity: Arc<ConnectivityMonitor>,
    store: OrderStore,
}

impl HealthReporter {
    /// Build a reporter over the given connectivity monitor and store handle.
    #[must_use]
    pub fn new(connectivity: Arc<ConnectivityMonitor>, store: OrderStore) -> Self {
        Self { connectivity, store }
    }

    /// Liveness ignores broker status: UP whenever the process is responsive.
    #[must_use]
    pub fn liveness(&self) -> HealthReport {
        HealthReport {
            status: CheckStatus::Up,
            service: CheckStatus::Up,
            broker: CheckStatus::Up,
            state: CheckStatus::Up,
        }
    }

    /// Readiness: UP iff `service` and `state` are UP and `broker` reports
    /// UP or DEGRADED. Broker DOWN drives readiness DOWN (and a 503 from the
    /// HTTP layer).
    pub async fn readiness(&self) -> HealthReport {
        self.connectivity.ping_now().await;

        let broker = if self.connectivity.is_broker_connected() && self.connectivity.is_topic_ready() {
            CheckStatus::Up
        } else if self.connectivity.is_broker_connected() {
            CheckStatus::Degraded
        } else {
            CheckStatus::Down
        };

        let state = if self.store_is_readable() {
            CheckStatus::Up
        } else {
            CheckStatus::Down
        };

        let status = if state == CheckStatus::Up && broker != CheckStatus::Down {
            CheckStatus::Up
        } else {
            CheckStatus::Down
        };

        HealthReport {
            status,
            service: CheckStatus::Up,
            broker,
            state,
        }
    }

    fn store_is_readable(&self) -> bool {
        // snapshot_len() takes the read lock; a poisoned lock would panic in
        // the inner unwrap_or_else, so reaching this point means the store
        // is readable.
        let _ = self.store.snapshot_len();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KafkaConfig;
    use std::time::Duration;

    #[test]
    fn liveness_is_always_up() {
        let connectivity = Arc::new(ConnectivityMonitor::new(KafkaConfig {
            bootstrap_servers: "127.0.0.1:1".to_string(),
            topic: "orders".to_string(),
            dlt_topic: "orders.dlt".to_string(),
            request_timeout: Duration::from_millis(50),
            delivery_timeout: Duration::from_millis(100),
            api_timeout: Duration::from_millis(150),
        }));
        let store = OrderStore::new();
        let reporter = HealthReporter::new(connectivity, store);

        assert_eq!(reporter.liveness().status, CheckStatus::Up);
    }
}
