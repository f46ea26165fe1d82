//! Synchronous publish engine (C7) — the producer's core.
//!
//! `publish` always resolves to one of the three definitive outcomes the
//! contract in spec §4.7 names: `Ack`, a classified `Failure`, or — never —
//! silent success while the message might still land later. The two-second
//! gap between `delivery_timeout` and `api_timeout` (config §4.7) is what
//! makes the failure verdict definitive.

use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use tokio::sync::Mutex;

use axum::http::StatusCode;
use order_domain::{FailureMetadata, FailureRecord};
use serde::Serialize;
use thiserror::Error;

use crate::broker::connectivity::classify_probe_error;
use crate::config::KafkaConfig;
use crate::resilience::{CircuitBreaker, CircuitBreakerConfig};

/// Classified publish outcome kinds (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Transport-level broker unreachability.
    #[error("broker unreachable")]
    BrokerDown,
    /// The target topic does not exist or has no leader.
    #[error("topic not found")]
    TopicNotFound,
    /// The circuit breaker rejected the call without attempting it.
    #[error("circuit open")]
    CircuitOpen,
    /// The publish exceeded the API timeout budget.
    #[error("publish timed out")]
    Timeout,
    /// The payload could not be serialized.
    #[error("serialization failed")]
    Serialization,
    /// The publish was interrupted by cancellation.
    #[error("interrupted")]
    Interrupted,
    /// Any other, unclassified failure.
    #[error("unexpected publish failure")]
    Unexpected,
}

impl FailureKind {
    /// HTTP status this failure kind maps to on the producer side (spec §6).
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
            Self::BrokerDown | Self::TopicNotFound | Self::Timeout | Self::Serialization | Self::Interrupted | Self::Unexpected => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable reason string, also used in DLT headers.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::BrokerDown => "BROKER_DOWN",
            Self::TopicNotFound => "TOPIC_NOT_FOUND",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::Timeout => "TIMEOUT",
            Self::Serialization => "SERIALIZATION",
            Self::Interrupted => "INTERRUPTED",
            Self::Unexpected => "UNEXPECTED",
        }
    }
}

/// Outcome of [`PublishEngine::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Broker confirmed receipt under the configured durability level.
    Ack,
}

/// The producer's core publish path: circuit breaker, synchronous
/// `rdkafka` send, DLT fallback, file fallback.
pub struct PublishEngine {
    producer: FutureProducer,
    config: KafkaConfig,
    circuit_breaker: CircuitBreaker,
    failure_log: Mutex<std::fs::File>,
}

impl PublishEngine {
    /// Build a new engine from an already-constructed `rdkafka` producer.
    pub fn new(producer: FutureProducer, config: KafkaConfig, failure_log_path: &str) -> std::io::Result<Self> {
        let failure_log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(failure_log_path)?;

        Ok(Self {
            producer,
            config,
            circuit_breaker: CircuitBreaker::new("orders-broker", CircuitBreakerConfig::orders()),
            failure_log: Mutex::new(failure_log),
        })
    }

    /// Current circuit breaker metrics, for `/health` and metrics endpoints.
    #[must_use]
    pub fn circuit_breaker_metrics(&self) -> crate::resilience::CircuitBreakerMetrics {
        self.circuit_breaker.metrics()
    }

    /// Publish `payload` keyed by `order_id` to the `ORDERS` topic.
    ///
    /// Synchronous from the caller's point of view: resolves within
    /// `api_timeout` to either `Ack` or a classified `FailureKind`.
    pub async fn publish(&self, order_id: &str, payload: &str) -> Result<PublishOutcome, FailureKind> {
        if !self.circuit_breaker.is_call_permitted() {
            tracing::warn!(order_id = %order_id, "circuit open, rejecting publish");
            crate::observability::metrics::record_publish(FailureKind::CircuitOpen.reason());
            return Err(FailureKind::CircuitOpen);
        }

        let send = self.send_with_deadline(order_id, payload);
        let result = tokio::time::timeout(self.config.api_timeout, send).await;

        let outcome = match result {
            Ok(Ok(())) => {
                self.circuit_breaker.record_success();
                Ok(PublishOutcome::Ack)
            }
            Ok(Err(kind)) => {
                self.circuit_breaker.record_failure();
                Err(kind)
            }
            Err(_elapsed) => {
                self.circuit_breaker.record_failure();
                Err(FailureKind::Timeout)
            }
        };

        crate::observability::metrics::record_publish(match &outcome {
            Ok(_) => "ACK",
            Err(kind) => kind.reason(),
        });
        crate::observability::metrics::record_circuit_breaker_state(
            self.circuit_breaker.name(),
            circuit_state_gauge(self.circuit_breaker.state()),
        );

        if let Err(kind) = outcome {
            self.handle_failure(order_id, payload, kind).await;
        }

        outcome
    }

    async fn send_with_deadline(&self, order_id: &str, payload: &str) -> Result<(), FailureKind> {
        let record: FutureRecord<'_, str, str> = FutureRecord::to(&self.config.topic)
            .key(order_id)
            .payload(payload);

        match self.producer.send(record, Duration::from_millis(0)).await {
            Ok(_delivery) => Ok(()),
            Err((kafka_error, _owned_message)) => Err(classify_kafka_error(&kafka_error)),
        }
    }

    /// Failure fallbacks: primary DLT publish, secondary append-only file.
    async fn handle_failure(&self, order_id: &str, payload: &str, kind: FailureKind) {
        if kind == FailureKind::CircuitOpen {
            // No DLT attempt while the circuit is open — it would likely fail
            // the same way and only adds latency.
            self.append_to_file(order_id, payload, kind).await;
            return;
        }

        let metadata = FailureMetadata {
            original_topic: self.config.topic.clone(),
            original_partition: None,
            original_offset: None,
            original_timestamp: Utc::now(),
            exception_class: format!("{kind:?}"),
            exception_message: kind.to_string(),
            exception_stacktrace: String::new(),
            failed_at: Utc::now(),
        };

        let headers = metadata.as_headers();
        let mut kafka_headers = rdkafka::message::OwnedHeaders::new();
        for (key, value) in &headers {
            kafka_headers = kafka_headers.insert(rdkafka::message::Header {
                key,
                value: Some(value.as_str()),
            });
        }

        let record: FutureRecord<'_, str, str> = FutureRecord::to(&self.config.dlt_topic)
            .key(order_id)
            .payload(payload)
            .headers(kafka_headers);

        let dlt_result =
            tokio::time::timeout(Duration::from_secs(3), self.producer.send(record, Duration::from_millis(0))).await;

        match dlt_result {
            Ok(Ok(_delivery)) => {
                tracing::warn!(order_id = %order_id, kind = kind.reason(), "publish failed, routed to DLT");
                crate::observability::metrics::record_dlt_publish(kind.reason());
            }
            _ => {
                tracing::error!(order_id = %order_id, kind = kind.reason(), "DLT publish also failed, using file fallback");
                self.append_to_file(order_id, payload, kind).await;
            }
        }
    }

    async fn append_to_file(&self, order_id: &str, payload: &str, kind: FailureKind) {
        let record = FailureRecord {
            key: order_id.to_string(),
            payload: payload.to_string(),
            metadata: FailureMetadata {
                original_topic: self.config.topic.clone(),
                original_partition: None,
                original_offset: None,
                original_timestamp: Utc::now(),
                exception_class: format!("{kind:?}"),
                exception_message: kind.to_string(),
                exception_stacktrace: String::new(),
                failed_at: Utc::now(),
            },
        };

        let line = record.as_file_line(kind.reason());
        let mut file = self.failure_log.lock().await;
        if let Err(err) = writeln!(file, "{line}") {
            tracing::error!(order_id = %order_id, error = %err, "failed to write file fallback record");
        } else {
            crate::observability::metrics::record_file_fallback(kind.reason());
        }
    }
}

/// Map a circuit state to the gauge convention (0=CLOSED, 1=OPEN, 2=HALF_OPEN).
const fn circuit_state_gauge(state: crate::resilience::CircuitBreakerState) -> f64 {
    match state {
        crate::resilience::CircuitBreakerState::Closed => 0.0,
        crate::resilience::CircuitBreakerState::Open => 1.0,
        crate::resilience::CircuitBreakerState::HalfOpen => 2.0,
    }
}


fn classify_kafka_error(error: &KafkaError) -> FailureKind {
    match error {
        KafkaError::MessageProduction(rdkafka::types::RDKafkaErrorCode::MessageTimedOut) => FailureKind::Timeout,
        KafkaError::Canceled => FailureKind::Interrupted,
        _ => match classify_probe_error(&error.to_string()) {
            crate::broker::connectivity::ProbeFailure::BrokerDown => FailureKind::BrokerDown,
            crate::broker::connectivity::ProbeFailure::TopicNotFound => FailureKind::TopicNotFound,
        },
    }
}
