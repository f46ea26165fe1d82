//! Prometheus metrics for the order service.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Error installing the metrics exporter.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to install the Prometheus exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Install the Prometheus exporter, exposing metrics on `listen_addr`.
pub fn init_metrics(listen_addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %listen_addr, "Prometheus metrics exporter started");
    Ok(())
}

/// Record a pipeline outcome (`WRITTEN`, `SKIPPED_*`, `DLT`).
pub fn record_consume_outcome(outcome: &str) {
    counter!("consume_outcomes_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a DLT publish from the consumer side.
pub fn record_dlt_publish(reason: &str) {
    counter!("dlt_publishes_total", "reason" => reason.to_string()).increment(1);
}

/// Record a retry attempt before a message either commits or routes to DLT.
pub fn record_retry_attempt() {
    counter!("consume_retries_total").increment(1);
}

/// Update the broker connectivity gauge (1=up, 0=down).
pub fn record_broker_connected(connected: bool) {
    gauge!("broker_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Update the consume engine lifecycle state gauge (spec §4.8's four states).
pub fn record_engine_state(state: f64) {
    gauge!("consume_engine_state").set(state);
}
