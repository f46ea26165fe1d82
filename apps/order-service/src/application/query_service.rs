//! Read-only query surface (C10): `getOrderDetails` / `listAllOrderIds`.
//!
//! Neither operation touches the broker; both are answerable purely from
//! `ProcessedOrderStore`, so they stay available even while the consume
//! engine is stopped for a down broker (spec §4.10).

use order_domain::normalize_order_id;

use crate::domain::{ProcessedOrder, ProcessedOrderStore};
use crate::error::OrderServiceError;

/// Coordinates the two read-only query operations over `ProcessedOrderStore`.
pub struct QueryService {
    store: ProcessedOrderStore,
}

impl QueryService {
    /// Build a query service over the given store handle.
    #[must_use]
    pub fn new(store: ProcessedOrderStore) -> Self {
        Self { store }
    }

    /// Access to the underlying store, for health checks.
    #[must_use]
    pub fn store(&self) -> &ProcessedOrderStore {
        &self.store
    }

    /// `getOrderDetails(orderId)` (spec §4.10).
    pub fn get_order_details(&self, raw_order_id: &str) -> Result<ProcessedOrder, OrderServiceError> {
        let order_id = normalize_order_id(raw_order_id)?;
        self.store
            .get(&order_id)
            .ok_or(OrderServiceError::OrderNotFound(order_id))
    }

    /// `listAllOrderIds()` (spec §4.10).
    #[must_use]
    pub fn list_all_order_ids(&self) -> Vec<String> {
        self.store.order_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use order_domain::{Order, Status};
    use rust_decimal_macros::dec;

    fn sample(order_id: &str) -> ProcessedOrder {
        ProcessedOrder {
            order: Order {
                order_id: order_id.to_string(),
                customer_id: "CUST-1".to_string(),
                order_date: Utc::now(),
                items: vec![],
                total_amount: dec!(10.00),
                currency: "USD".to_string(),
                status: Status::New,
            },
            shipping_cost: dec!(0.20),
        }
    }

    #[test]
    fn get_order_details_normalizes_id_before_lookup() {
        let store = ProcessedOrderStore::new();
        store.put("ORD-00A1", sample("ORD-00A1"));
        let service = QueryService::new(store);

        let found = service.get_order_details("a1").unwrap();
        assert_eq!(found.order.order_id, "ORD-00A1");
    }

    #[test]
    fn get_order_details_rejects_unknown_id() {
        let service = QueryService::new(ProcessedOrderStore::new());
        let result = service.get_order_details("a1");
        assert!(matches!(result, Err(OrderServiceError::OrderNotFound(_))));
    }

    #[test]
    fn get_order_details_rejects_malformed_id() {
        let service = QueryService::new(ProcessedOrderStore::new());
        let result = service.get_order_details("");
        assert!(matches!(result, Err(OrderServiceError::Validation(_))));
    }

    #[test]
    fn list_all_order_ids_reflects_store_contents() {
        let store = ProcessedOrderStore::new();
        store.put("ORD-0001", sample("ORD-0001"));
        store.put("ORD-0002", sample("ORD-0002"));
        let service = QueryService::new(store);

        let mut ids = service.list_all_order_ids();
        ids.sort();
        assert_eq!(ids, vec!["ORD-0001".to_string(), "ORD-0002".to_string()]);
    }
}
