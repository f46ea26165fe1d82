//! Process-local order store (C3).
//!
//! Maps `orderId → Order` with explicit rollback handles, so failure-triggered
//! cleanup is part of the happy-path control flow rather than an implicit
//! transaction.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use order_domain::Order;
use thiserror::Error;

/// Errors returned by [`OrderStore`] operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderStoreError {
    /// `createTentative` was called for an orderId already present.
    #[error("order {0} already exists")]
    DuplicateOrder(String),
    /// `updateTentative` was called for an orderId not present.
    #[error("order {0} not found")]
    OrderNotFound(String),
}

/// A handle that undoes exactly one store mutation.
///
/// Returned by `create_tentative`/`update_tentative` and invoked by
/// `OrderService` when `PublishEngine` reports a definitive failure. Modeled
/// as an enum (not a closure) so it stays `Send` and loggable.
#[derive(Debug, Clone)]
pub enum RollbackHandle {
    /// Undo a tentative insert by removing the key.
    Remove(String),
    /// Undo a tentative replace by restoring the prior value.
    Restore(String, Box<Order>),
}

impl RollbackHandle {
    /// Apply this rollback against `store`.
    pub fn rollback(self, store: &OrderStore) {
        match self {
            Self::Remove(order_id) => {
                tracing::warn!(order_id = %order_id, "rolling back tentative create");
                store.remove(&order_id);
            }
            Self::Restore(order_id, previous) => {
                tracing::warn!(order_id = %order_id, "rolling back tentative update");
                store.restore(&order_id, *previous);
            }
        }
    }
}

/// Process-local mapping of `orderId → Order`.
///
/// Safe for concurrent distinct keys; per-key reads/writes are serialized by
/// holding the write lock for the whole read-modify-write. Cheaply `Clone`
/// (an `Arc` around the lock) so both `OrderService` and `HealthReporter` can
/// hold a handle onto the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl OrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a brand-new order. Fails with `DuplicateOrder` if the key is
    /// already present; otherwise returns a handle that removes it on rollback.
    pub fn create_tentative(&self, order: Order) -> Result<RollbackHandle, OrderStoreError> {
        let mut orders = self
            .orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if orders.contains_key(&order.order_id) {
            return Err(OrderStoreError::DuplicateOrder(order.order_id.clone()));
        }

        let order_id = order.order_id.clone();
        orders.insert(order_id.clone(), order);
        Ok(RollbackHandle::Remove(order_id))
    }

    /// Replace an existing order. Fails with `OrderNotFound` if the key is
    /// absent; otherwise returns a handle that restores the previous value.
    pub fn update_tentative(&self, order: Order) -> Result<RollbackHandle, OrderStoreError> {
        let mut orders = self
            .orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let order_id = order.order_id.clone();
        let Some(previous) = orders.insert(order_id.clone(), order) else {
            // insert() already wrote the new value into an absent slot; undo that.
            orders.remove(&order_id);
            return Err(OrderStoreError::OrderNotFound(order_id));
        };

        Ok(RollbackHandle::Restore(order_id, Box::new(previous)))
    }

    /// Look up the current order for `order_id`, if any.
    #[must_use]
    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.orders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(order_id)
            .cloned()
    }

    fn remove(&self, order_id: &str) {
        self.orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(order_id);
    }

    fn restore(&self, order_id: &str, previous: Order) {
        self.orders
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(order_id.to_string(), previous);
    }

    /// Number of orders currently held. Test/diagnostic helper.
    #[must_use]
    pub fn snapshot_len(&self) -> usize {
        self.orders
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the store currently holds no orders. Test/diagnostic helper.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot_len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use order_domain::Status;
    use rust_decimal_macros::dec;

    fn sample_order(order_id: &str, status: Status) -> Order {
        Order {
            order_id: order_id.to_string(),
            customer_id: "CUST-1".to_string(),
            order_date: Utc::now(),
            items: vec![],
            total_amount: dec!(10.00),
            currency: "USD".to_string(),
            status,
        }
    }

    #[test]
    fn create_tentative_rejects_duplicate() {
        let store = OrderStore::new();
        store.create_tentative(sample_order("ORD-0001", Status::New)).unwrap();

        let err = store
            .create_tentative(sample_order("ORD-0001", Status::New))
            .unwrap_err();
        assert_eq!(err, OrderStoreError::DuplicateOrder("ORD-0001".to_string()));
    }

    #[test]
    fn update_tentative_rejects_missing() {
        let store = OrderStore::new();
        let err = store
            .update_tentative(sample_order("ORD-0001", Status::Confirmed))
            .unwrap_err();
        assert_eq!(err, OrderStoreError::OrderNotFound("ORD-0001".to_string()));
        assert!(store.is_empty());
    }

    #[test]
    fn rollback_of_create_removes_key() {
        let store = OrderStore::new();
        let handle = store.create_tentative(sample_order("ORD-0001", Status::New)).unwrap();
        handle.rollback(&store);
        assert!(store.get("ORD-0001").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn rollback_of_update_restores_previous_value() {
        let store = OrderStore::new();
        store.create_tentative(sample_order("ORD-0001", Status::New)).unwrap();

        let handle = store
            .update_tentative(sample_order("ORD-0001", Status::Confirmed))
            .unwrap();
        assert_eq!(store.get("ORD-0001").unwrap().status, Status::Confirmed);

        handle.rollback(&store);
        assert_eq!(store.get("ORD-0001").unwrap().status, Status::New);
    }

    #[test]
    fn distinct_keys_do_not_interfere() {
        let store = OrderStore::new();
        store.create_tentative(sample_order("ORD-0001", Status::New)).unwrap();
        store.create_tentative(sample_order("ORD-0002", Status::New)).unwrap();
        assert_eq!(store.snapshot_len(), 2);
    }
}
