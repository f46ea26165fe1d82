// Allow unwrap/expect in tests - tests should panic on unexpected errors.
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines
    )
)]

//! Order Service — the consumer half of the order-processing system.
//!
//! Ingests `ORDERS` events, gates them through offset- and state-based
//! idempotency plus [`order_domain::StatusMachine`] sequencing, derives a
//! shipping cost, and exposes the resulting per-order state over HTTP.
//!
//! # Layers
//!
//! - [`domain`] — `ProcessedOrderStore` (C4), `IdempotencyIndex` (C5),
//!   `shipping_calculator` (C2).
//! - [`consume`] — `ConnectivityMonitor` (C6), client construction, and
//!   `ConsumeEngine` (C8), the ten-step pipeline plus retry-with-DLT.
//! - [`application`] — `QueryService` (C10), the read-only surface.
//! - [`server`] — the Axum HTTP surface.
//! - [`config`] — environment-variable configuration.
//! - [`health`] — `HealthReporter` (C11).
//! - [`observability`] — Prometheus metrics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Application/orchestration layer: the read-only query surface.
pub mod application;
/// The ingest path: connectivity, client construction, backoff, the engine.
pub mod consume;
/// Environment-variable configuration.
pub mod config;
/// Consumer-local domain state.
pub mod domain;
/// Consumer error taxonomy and HTTP status mapping.
pub mod error;
/// Liveness/readiness reporting.
pub mod health;
/// Prometheus metrics.
pub mod observability;
/// HTTP/JSON API server.
pub mod server;

pub use application::QueryService;
pub use error::OrderServiceError;
