//! Process-local `ProcessedOrderStore` (C4).
//!
//! Maps `orderId → ProcessedOrder`. Operations are atomic per key; readers
//! observe either pre- or post-update values, never torn state (spec §4.4).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use order_domain::Order;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `(order, shippingCost)` pair (spec §3). Composition, not inheritance:
/// `order` is the exact last accepted `Order` for that `orderId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedOrder {
    /// The last accepted order for this id.
    pub order: Order,
    /// Derived shipping cost for that order.
    pub shipping_cost: Decimal,
}

/// Process-local mapping of `orderId → ProcessedOrder`.
///
/// Safe for concurrent distinct keys; the write lock is held for the whole
/// read-modify-write of one key's entry so readers never observe torn state.
#[derive(Debug, Clone, Default)]
pub struct ProcessedOrderStore {
    orders: Arc<RwLock<HashMap<String, ProcessedOrder>>>,
}

impl ProcessedOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Atomically replace the entry for `order_id`.
    pub fn put(&self, order_id: &str, processed: ProcessedOrder) {
        self.orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(order_id.to_string(), processed);
    }

    /// Look up the current processed order for `order_id`, if any.
    #[must_use]
    pub fn get(&self, order_id: &str) -> Option<ProcessedOrder> {
        self.orders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(order_id)
            .cloned()
    }

    /// Snapshot of every order id currently held, for `listAllOrderIds`.
    #[must_use]
    pub fn order_ids(&self) -> Vec<String> {
        self.orders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of orders currently held. Test/diagnostic helper.
    #[must_use]
    pub fn snapshot_len(&self) -> usize {
        self.orders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use order_domain::Status;
    use rust_decimal_macros::dec;

    fn sample(order_id: &str, status: Status) -> ProcessedOrder {
        ProcessedOrder {
            order: Order {
                order_id: order_id.to_string(),
                customer_id: "CUST-1".to_string(),
                order_date: Utc::now(),
                items: vec![],
                total_amount: dec!(10.00),
                currency: "USD".to_string(),
                status,
            },
            shipping_cost: dec!(0.20),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = ProcessedOrderStore::new();
        store.put("ORD-0001", sample("ORD-0001", Status::New));
        assert_eq!(store.get("ORD-0001").unwrap().order.status, Status::New);
    }

    #[test]
    fn missing_key_returns_none() {
        let store = ProcessedOrderStore::new();
        assert!(store.get("ORD-0001").is_none());
    }

    #[test]
    fn put_overwrites_previous_entry_for_same_key() {
        let store = ProcessedOrderStore::new();
        store.put("ORD-0001", sample("ORD-0001", Status::New));
        store.put("ORD-0001", sample("ORD-0001", Status::Confirmed));
        assert_eq!(store.get("ORD-0001").unwrap().order.status, Status::Confirmed);
        assert_eq!(store.snapshot_len(), 1);
    }

    #[test]
    fn order_ids_snapshots_keyset() {
        let store = ProcessedOrderStore::new();
        store.put("ORD-0001", sample("ORD-0001", Status::New));
        store.put("ORD-0002", sample("ORD-0002", Status::New));
        let mut ids = store.order_ids();
        ids.sort();
        assert_eq!(ids, vec!["ORD-0001".to_string(), "ORD-0002".to_string()]);
    }
}
