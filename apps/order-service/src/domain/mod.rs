//! Consumer-local domain state.

pub mod idempotency_index;
pub mod processed_order_store;
pub mod shipping_calculator;

pub use idempotency_index::{IdempotencyIndex, ProcessedMessageInfo};
pub use processed_order_store::{ProcessedOrder, ProcessedOrderStore};
pub use shipping_calculator::shipping_cost;
