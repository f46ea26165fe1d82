//! Producer-local domain state.

pub mod order_store;

pub use order_store::{OrderStore, OrderStoreError, RollbackHandle};
