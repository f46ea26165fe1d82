//! HTTP/JSON API server for the order service (spec §6 consumer surface).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::QueryService;
use crate::error::OrderServiceError;
use crate::health::HealthReporter;

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct OrderServer {
    query_service: Arc<QueryService>,
    health: Arc<HealthReporter>,
}

impl OrderServer {
    /// Build a new server wrapper.
    #[must_use]
    pub fn new(query_service: Arc<QueryService>, health: Arc<HealthReporter>) -> Self {
        Self { query_service, health }
    }
}

/// Build the Axum router with all consumer endpoints.
pub fn create_router(server: OrderServer) -> Router {
    Router::new()
        .route("/order-details", post(order_details))
        .route("/getAllOrdersFromTopic", post(all_order_ids))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .with_state(server)
}

#[derive(Debug, Deserialize)]
struct OrderDetailsRequest {
    order_id: String,
}

#[derive(Debug, Serialize)]
struct OrderDetailsResponse {
    order_id: String,
    customer_id: String,
    status: String,
    total_amount: Decimal,
    shipping_cost: Decimal,
    currency: String,
}

#[derive(Debug, Serialize)]
struct AllOrderIdsResponse {
    order_ids: Vec<String>,
}

async fn order_details(
    State(server): State<OrderServer>,
    Json(req): Json<OrderDetailsRequest>,
) -> Result<Json<OrderDetailsResponse>, OrderServiceError> {
    let processed = server.query_service.get_order_details(&req.order_id)?;
    Ok(Json(OrderDetailsResponse {
        order_id: processed.order.order_id,
        customer_id: processed.order.customer_id,
        status: processed.order.status.to_string(),
        total_amount: processed.order.total_amount,
        shipping_cost: processed.shipping_cost,
        currency: processed.order.currency,
    }))
}

async fn all_order_ids(State(server): State<OrderServer>) -> impl IntoResponse {
    let order_ids = server.query_service.list_all_order_ids();
    (StatusCode::OK, Json(AllOrderIdsResponse { order_ids }))
}

async fn health_live(State(server): State<OrderServer>) -> impl IntoResponse {
    let report = server.health.liveness();
    (StatusCode::OK, Json(report))
}

async fn health_ready(State(server): State<OrderServer>) -> impl IntoResponse {
    let report = server.health.readiness().await;
    let status = if report.status == crate::health::CheckStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
