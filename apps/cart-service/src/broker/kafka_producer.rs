//! Construction of the `rdkafka` producer client.
//!
//! All durability knobs mandated by spec §4.7 live here, in one place, so the
//! rest of `PublishEngine` never has to reason about wire-level configuration.

use rdkafka::ClientConfig;
use rdkafka::producer::FutureProducer;

use crate::config::KafkaConfig;

/// Build the `FutureProducer` used by `PublishEngine`.
///
/// `acks=all`, `enable.idempotence=true`, and
/// `max.in.flight.requests.per.connection=1` are non-negotiable per spec and
/// are never exposed as configuration.
pub fn build_producer(config: &KafkaConfig) -> Result<FutureProducer, rdkafka::error::KafkaError> {
    ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("acks", "all")
        .set("enable.idempotence", "true")
        .set("max.in.flight.requests.per.connection", "1")
        .set("message.timeout.ms", config.delivery_timeout.as_millis().to_string())
        .set("request.timeout.ms", config.request_timeout.as_millis().to_string())
        .set("retry.backoff.ms", "100")
        .create()
}
