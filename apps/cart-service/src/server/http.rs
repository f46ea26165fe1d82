//! HTTP/JSON API server for the cart service (spec §6 producer surface).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::application::{CreateOrderRequest, OrderService, UpdateOrderRequest};
use crate::error::CartServiceError;
use crate::health::HealthReporter;

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct CartServer {
    order_service: Arc<OrderService>,
    health: Arc<HealthReporter>,
}

impl CartServer {
    /// Build a new server wrapper.
    #[must_use]
    pub fn new(order_service: Arc<OrderService>, health: Arc<HealthReporter>) -> Self {
        Self { order_service, health }
    }
}

/// Build the Axum router with all producer endpoints.
pub fn create_router(server: CartServer) -> Router {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/update-order", put(update_order))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .with_state(server)
}

#[derive(Debug, Serialize)]
struct OrderResponse {
    order_id: String,
    customer_id: String,
    status: String,
    total_amount: String,
    currency: String,
}

impl From<order_domain::Order> for OrderResponse {
    fn from(order: order_domain::Order) -> Self {
        Self {
            order_id: order.order_id,
            customer_id: order.customer_id,
            status: order.status.to_string(),
            total_amount: order.total_amount.to_string(),
            currency: order.currency,
        }
    }
}

async fn create_order(
    State(server): State<CartServer>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), CartServiceError> {
    let order = server.order_service.create_order(req).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

async fn update_order(
    State(server): State<CartServer>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, CartServiceError> {
    let order = server.order_service.update_order(req).await?;
    Ok(Json(OrderResponse::from(order)))
}

async fn health_live(State(server): State<CartServer>) -> impl IntoResponse {
    let report = server.health.liveness();
    (StatusCode::OK, Json(report))
}

async fn health_ready(State(server): State<CartServer>) -> impl IntoResponse {
    let report = server.health.readiness().await;
    let status = if report.status == crate::health::CheckStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{ConnectivityMonitor, PublishEngine};
    use crate::config::KafkaConfig;
    use crate::domain::OrderStore;
    use axum::body::Body;
    use axum::http::Request;
    use rdkafka::ClientConfig;
    use rdkafka::producer::FutureProducer;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_server() -> (CartServer, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("failures.log");

        let kafka_config = KafkaConfig {
            bootstrap_servers: "127.0.0.1:1".to_string(),
            topic: "orders".to_string(),
            dlt_topic: "orders.dlt".to_string(),
            request_timeout: Duration::from_millis(50),
            delivery_timeout: Duration::from_millis(100),
            api_timeout: Duration::from_millis(150),
        };

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &kafka_config.bootstrap_servers)
            .set("message.timeout.ms", "100")
            .create()
            .unwrap();

        let engine = PublishEngine::new(producer, kafka_config.clone(), log_path.to_str().unwrap()).unwrap();
        let order_service = Arc::new(OrderService::new(OrderStore::new(), engine));

        let connectivity = Arc::new(ConnectivityMonitor::new(kafka_config));
        let store = OrderStore::new();
        let health = Arc::new(HealthReporter::new(connectivity, store));

        (CartServer::new(order_service, health), dir)
    }

    #[tokio::test]
    async fn health_live_is_always_200() {
        let (server, _dir) = test_server();
        let app = create_router(server);

        let request = Request::builder().uri("/health/live").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_ready_is_503_when_broker_unreachable() {
        let (server, _dir) = test_server();
        let app = create_router(server);

        let request = Request::builder().uri("/health/ready").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn create_order_with_broker_unreachable_returns_500() {
        let (server, _dir) = test_server();
        let app = create_router(server);

        let body = serde_json::json!({
            "order_id": "a1",
            "customer_id": "cust-1",
            "items": [{"item_id": "sku-1", "quantity": 2, "price": "5.00"}],
            "currency": "USD",
        });

        let request = Request::builder()
            .method("POST")
            .uri("/create-order")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
