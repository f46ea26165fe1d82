//! Prometheus metrics for the cart service.

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

/// Record a publish attempt outcome.
pub fn record_publish(status: &str) {
    counter!("publish_attempts_total", "status" => status.to_string()).increment(1);
}

/// Record a DLT publish.
pub fn record_dlt_publish(kind: &str) {
    counter!("dlt_publishes_total", "kind" => kind.to_string()).increment(1);
}

/// Record a file-fallback write.
pub fn record_file_fallback(kind: &str) {
    counter!("file_fallback_writes_total", "kind" => kind.to_string()).increment(1);
}

/// Update the circuit breaker state gauge (0=CLOSED, 1=OPEN, 2=HALF_OPEN).
pub fn record_circuit_breaker_state(name: &str, state: f64) {
    gauge!("circuit_breaker_state", "name" => name.to_string()).set(state);
}

/// Update the broker connectivity gauge (1=up, 0=down).
pub fn record_broker_connected(connected: bool) {
    gauge!("broker_connected").set(if connected { 1.0 } else { 0.0 });
}
