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

//! Cart Service — the producer half of the order-processing system.
//!
//! Accepts HTTP order create/update requests, validates state transitions
//! with [`order_domain::StatusMachine`], and publishes order events to the
//! `ORDERS` topic with strict per-order ordering and at-least-once
//! durability.
//!
//! # Layers
//!
//! - [`domain`] — process-local `OrderStore` with rollback handles (C3).
//! - [`application`] — `OrderService`, the save→publish→commit-or-rollback
//!   coordinator (C9).
//! - [`resilience`] — the circuit breaker guarding the publish path.
//! - [`broker`] — `ConnectivityMonitor` (C6) and `PublishEngine` (C7).
//! - [`server`] — the Axum HTTP surface.
//! - [`config`] — environment-variable configuration.
//! - [`health`] — `HealthReporter` (C11).
//! - [`observability`] — Prometheus metrics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Application/orchestration layer.
pub mod application;
/// Broker-facing modules: connectivity, retry, publish engine.
pub mod broker;
/// Environment-variable configuration.
pub mod config;
/// Producer-local domain state.
pub mod domain;
/// Producer error taxonomy and HTTP status mapping.
pub mod error;
/// Liveness/readiness reporting.
pub mod health;
/// Prometheus metrics.
pub mod observability;
/// Resilience primitives for the publish path.
pub mod resilience;
/// HTTP/JSON API server.
pub mod server;

pub use application::OrderService;
pub use error::CartServiceError;
