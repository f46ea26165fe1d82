//! Producer orchestrator (C9): the save → publish → commit-or-rollback
//! coordinator enforcing I7 on the producer side.

use chrono::Utc;
use order_domain::{normalize_order_id, Order, OrderItem, Status, StatusMachine};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::broker::PublishEngine;
use crate::domain::OrderStore;
use crate::error::CartServiceError;

/// Request body for `POST /create-order`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Raw, not-yet-normalized order id.
    pub order_id: String,
    /// Customer identifier, passed through unchanged.
    pub customer_id: String,
    /// Line items.
    pub items: Vec<OrderItemRequest>,
    /// ISO 4217-ish currency code.
    pub currency: String,
}

/// A line item as received over HTTP.
#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    /// Item identifier.
    pub item_id: String,
    /// Quantity ordered.
    pub quantity: u32,
    /// Unit price.
    pub price: Decimal,
}

/// Request body for `PUT /update-order`.
#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    /// Raw, not-yet-normalized order id.
    pub order_id: String,
    /// Requested next status, case-insensitive.
    pub status: String,
}

/// Coordinates validation, state mutation, publish, and rollback for
/// create/update requests (spec §4.9). Exposes both verbs directly rather
/// than splitting into one use-case struct per verb, since the rollback
/// control flow is meant to stay inline and readable (spec §9).
pub struct OrderService {
    store: OrderStore,
    publish_engine: PublishEngine,
}

impl OrderService {
    /// Build a new coordinator over the given store and publish engine.
    #[must_use]
    pub fn new(store: OrderStore, publish_engine: PublishEngine) -> Self {
        Self { store, publish_engine }
    }

    /// Access to the underlying store, for health/readiness checks.
    #[must_use]
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// Access to the publish engine, for health/metrics endpoints.
    #[must_use]
    pub fn publish_engine(&self) -> &PublishEngine {
        &self.publish_engine
    }

    /// `createOrder` (spec §4.9).
    pub async fn create_order(&self, req: CreateOrderRequest) -> Result<Order, CartServiceError> {
        let order_id = normalize_order_id(&req.order_id)?;

        let items: Vec<OrderItem> = req
            .items
            .into_iter()
            .map(|item| OrderItem {
                item_id: item.item_id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();
        let total_amount = Order::compute_total(&items);

        let order = Order {
            order_id: order_id.clone(),
            customer_id: req.customer_id,
            order_date: Utc::now(),
            items,
            total_amount,
            currency: req.currency,
            status: Status::New,
        };

        let rollback = self.store.create_tentative(order.clone())?;

        let payload = serde_json::to_string(&order).map_err(|e| {
            tracing::error!(order_id = %order_id, error = %e, "failed to serialize order");
            CartServiceError::Validation(format!("failed to serialize order: {e}"))
        });
        let payload = match payload {
            Ok(p) => p,
            Err(err) => {
                rollback.rollback(&self.store);
                return Err(err);
            }
        };

        match self.publish_engine.publish(&order_id, &payload).await {
            Ok(_ack) => Ok(order),
            Err(kind) => {
                rollback.rollback(&self.store);
                Err(CartServiceError::from(kind))
            }
        }
    }

    /// `updateOrder` (spec §4.9).
    pub async fn update_order(&self, req: UpdateOrderRequest) -> Result<Order, CartServiceError> {
        let order_id = normalize_order_id(&req.order_id)?;

        let next_status = Status::parse(&req.status)
            .ok_or_else(|| CartServiceError::Validation(format!("unknown status: {}", req.status)))?;

        let current = self
            .store
            .get(&order_id)
            .ok_or_else(|| CartServiceError::OrderNotFound(order_id.clone()))?;

        StatusMachine::validate_transition(Some(current.status), next_status)?;

        let updated = Order {
            status: next_status,
            ..current
        };

        let rollback = self.store.update_tentative(updated.clone())?;

        let payload = match serde_json::to_string(&updated) {
            Ok(p) => p,
            Err(e) => {
                rollback.rollback(&self.store);
                return Err(CartServiceError::Validation(format!("failed to serialize order: {e}")));
            }
        };

        match self.publish_engine.publish(&order_id, &payload).await {
            Ok(_ack) => Ok(updated),
            Err(kind) => {
                rollback.rollback(&self.store);
                Err(CartServiceError::from(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KafkaConfig;
    use rdkafka::ClientConfig;
    use rdkafka::producer::FutureProducer;
    use std::time::Duration;

    fn disconnected_service() -> (OrderService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("failures.log");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", "127.0.0.1:1")
            .set("message.timeout.ms", "100")
            .create()
            .unwrap();

        let kafka_config = KafkaConfig {
            bootstrap_servers: "127.0.0.1:1".to_string(),
            topic: "orders".to_string(),
            dlt_topic: "orders.dlt".to_string(),
            request_timeout: Duration::from_millis(50),
            delivery_timeout: Duration::from_millis(100),
            api_timeout: Duration::from_millis(150),
        };

        let engine = PublishEngine::new(producer, kafka_config, log_path.to_str().unwrap()).unwrap();
        (OrderService::new(OrderStore::new(), engine), dir)
    }

    fn sample_create_request(order_id: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            order_id: order_id.to_string(),
            customer_id: "CUST-1".to_string(),
            items: vec![OrderItemRequest {
                item_id: "sku-1".to_string(),
                quantity: 2,
                price: Decimal::new(500, 2),
            }],
            currency: "USD".to_string(),
        }
    }

    #[tokio::test]
    async fn create_order_rolls_back_store_on_publish_failure() {
        let (service, _dir) = disconnected_service();

        let result = service.create_order(sample_create_request("a1")).await;
        assert!(result.is_err());
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn update_order_rejects_unknown_status() {
        let (service, _dir) = disconnected_service();

        let result = service
            .update_order(UpdateOrderRequest {
                order_id: "a1".to_string(),
                status: "BOGUS".to_string(),
            })
            .await;

        assert!(matches!(result, Err(CartServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn update_order_rejects_missing_order() {
        let (service, _dir) = disconnected_service();

        let result = service
            .update_order(UpdateOrderRequest {
                order_id: "a1".to_string(),
                status: "CONFIRMED".to_string(),
            })
            .await;

        assert!(matches!(result, Err(CartServiceError::OrderNotFound(_))));
    }
}
