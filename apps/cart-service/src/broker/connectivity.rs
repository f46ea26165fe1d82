//! Broker connectivity monitor (C6), producer instantiation.
//!
//! Mirrors the teacher's `feed::health::FeedHealthTracker` shape — atomics
//! plus a background task publishing a health snapshot — adapted to probe
//! broker + topic metadata instead of feed message cadence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rdkafka::ClientConfig;
use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use tokio::sync::RwLock;

use crate::broker::retry::{BackoffPolicy, ExponentialBackoffCalculator};
use crate::config::KafkaConfig;

/// Classification of a connectivity probe failure (spec §4.6's two-pass
/// discipline, shared with `PublishEngine`'s classification of publish
/// failures).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// Transport-level failure: timeout, connection refused, metadata
    /// refresh failure, or similar. Checked first.
    BrokerDown,
    /// The `ORDERS` topic specifically does not exist or has no leader.
    /// Checked only once `BrokerDown` has been ruled out.
    TopicNotFound,
}

/// Classify a raw `rdkafka` error string using the two-pass discipline:
/// transport-level conditions are reported before the more specific
/// "unknown topic" condition, so a broker outage is never misclassified as
/// a configuration error.
#[must_use]
pub fn classify_probe_error(message: &str) -> ProbeFailure {
    let lower = message.to_lowercase();
    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection refused")
        || lower.contains("transport")
        || lower.contains("broker transport failure")
        || lower.contains("all brokers down")
    {
        return ProbeFailure::BrokerDown;
    }
    ProbeFailure::TopicNotFound
}

/// Background probe of broker + topic readiness (spec §4.6).
#[derive(Debug)]
pub struct ConnectivityMonitor {
    kafka_config: KafkaConfig,
    broker_connected: AtomicBool,
    topic_ready: AtomicBool,
    topic_not_found: AtomicBool,
    last_probe_at: RwLock<Option<Instant>>,
}

impl ConnectivityMonitor {
    /// Create a monitor for the given Kafka configuration. Starts
    /// `DISCONNECTED` until the first probe completes.
    #[must_use]
    pub fn new(kafka_config: KafkaConfig) -> Self {
        Self {
            kafka_config,
            broker_connected: AtomicBool::new(false),
            topic_ready: AtomicBool::new(false),
            topic_not_found: AtomicBool::new(false),
            last_probe_at: RwLock::new(None),
        }
    }

    /// Whether the broker is currently reachable.
    #[must_use]
    pub fn is_broker_connected(&self) -> bool {
        self.broker_connected.load(Ordering::Relaxed)
    }

    /// Whether the `ORDERS` topic is currently confirmed ready.
    #[must_use]
    pub fn is_topic_ready(&self) -> bool {
        self.topic_ready.load(Ordering::Relaxed)
    }

    /// Whether the last probe specifically found the topic missing.
    #[must_use]
    pub fn is_topic_not_found(&self) -> bool {
        self.topic_not_found.load(Ordering::Relaxed)
    }

    /// A single fresh probe with a ~3s deadline, updating the atomic flags.
    /// `HealthReporter` calls this synchronously on every readiness query.
    pub async fn ping_now(&self) {
        let outcome = tokio::time::timeout(Duration::from_secs(3), self.probe_once()).await;

        match outcome {
            Ok(Ok(())) => {
                self.broker_connected.store(true, Ordering::Relaxed);
                self.topic_ready.store(true, Ordering::Relaxed);
                self.topic_not_found.store(false, Ordering::Relaxed);
            }
            Ok(Err(failure)) => self.apply_failure(failure),
            Err(_elapsed) => self.apply_failure(ProbeFailure::BrokerDown),
        }

        *self.last_probe_at.write().await = Some(Instant::now());
        crate::observability::metrics::record_broker_connected(self.is_broker_connected());
    }

    fn apply_failure(&self, failure: ProbeFailure) {
        match failure {
            ProbeFailure::BrokerDown => {
                self.broker_connected.store(false, Ordering::Relaxed);
                self.topic_ready.store(false, Ordering::Relaxed);
                self.topic_not_found.store(false, Ordering::Relaxed);
            }
            ProbeFailure::TopicNotFound => {
                // Broker answered, so it is reachable; only the topic is missing.
                self.broker_connected.store(true, Ordering::Relaxed);
                self.topic_ready.store(false, Ordering::Relaxed);
                self.topic_not_found.store(true, Ordering::Relaxed);
            }
        }
    }

    async fn probe_once(&self) -> Result<(), ProbeFailure> {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.kafka_config.bootstrap_servers)
            .create()
            .map_err(|e| classify_probe_error(&e.to_string()))?;

        let metadata = admin
            .inner()
            .fetch_metadata(Some(&self.kafka_config.topic), Duration::from_secs(3))
            .map_err(|e| classify_probe_error(&e.to_string()))?;

        let topic_meta = metadata
            .topics()
            .iter()
            .find(|t| t.name() == self.kafka_config.topic);

        match topic_meta {
            Some(t) if !t.partitions().is_empty() && t.partitions().iter().all(|p| p.leader() >= 0) => {
                Ok(())
            }
            _ => Err(ProbeFailure::TopicNotFound),
        }
    }

    /// Run the adaptive-backoff monitoring loop forever. Intended to be
    /// `tokio::spawn`ed once at startup; never returns.
    pub async fn run(self: Arc<Self>) {
        let mut unhealthy_backoff = ExponentialBackoffCalculator::new(&BackoffPolicy::connectivity_unhealthy());

        loop {
            self.ping_now().await;

            if self.is_broker_connected() && self.is_topic_ready() {
                unhealthy_backoff.reset();
                tokio::time::sleep(Duration::from_secs(30)).await;
            } else {
                let delay = unhealthy_backoff.next_backoff().unwrap_or(Duration::from_secs(5));
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transport_errors_as_broker_down() {
        assert_eq!(classify_probe_error("Connection refused"), ProbeFailure::BrokerDown);
        assert_eq!(classify_probe_error("operation timed out"), ProbeFailure::BrokerDown);
        assert_eq!(
            classify_probe_error("Local: All broker connections are down"),
            ProbeFailure::BrokerDown
        );
    }

    #[test]
    fn classifies_other_errors_as_topic_not_found() {
        assert_eq!(
            classify_probe_error("Broker: Unknown topic or partition"),
            ProbeFailure::TopicNotFound
        );
    }

    #[test]
    fn new_monitor_starts_disconnected() {
        let monitor = ConnectivityMonitor::new(KafkaConfig {
            bootstrap_servers: "localhost:9092".to_string(),
            topic: "orders".to_string(),
            dlt_topic: "orders.dlt".to_string(),
            request_timeout: Duration::from_secs(3),
            delivery_timeout: Duration::from_secs(8),
            api_timeout: Duration::from_secs(10),
        });
        assert!(!monitor.is_broker_connected());
        assert!(!monitor.is_topic_ready());
    }
}
