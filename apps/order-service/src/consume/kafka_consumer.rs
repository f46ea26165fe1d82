//! Construction of the `rdkafka` consumer and DLT producer clients.
//!
//! Manual offset commits (`enable.auto.commit=false`) are non-negotiable —
//! `ConsumeEngine` commits only after one of the three definitive outcomes
//! in spec §4.8's pipeline, never on a timer.

use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::FutureProducer;

use crate::config::KafkaConfig;

/// Build the `StreamConsumer` used by `ConsumeEngine`, subscribed to `config.topic`.
pub fn build_consumer(config: &KafkaConfig) -> Result<StreamConsumer, rdkafka::error::KafkaError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", "10000")
        .create()?;

    consumer.subscribe(&[&config.topic])?;
    Ok(consumer)
}

/// Build the `FutureProducer` used to publish to `ORDERS.DLT`.
pub fn build_dlt_producer(config: &KafkaConfig) -> Result<FutureProducer, rdkafka::error::KafkaError> {
    ClientConfig::new()
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("acks", "all")
        .set("message.timeout.ms", "3000")
        .create()
}
