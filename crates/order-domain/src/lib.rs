//! Shared order model, status state machine, and wire schema.
//!
//! Linked into both `cart-service` (producer) and `order-service` (consumer)
//! so the two sides can never disagree about what an order id normalizes to,
//! what the `ORDERS` topic payload looks like, or which status transitions
//! are legal.

pub mod failure;
pub mod order;
pub mod status;

pub use failure::{
    FailureMetadata, FailureRecord, HEADER_EXCEPTION_CLASS, HEADER_EXCEPTION_MESSAGE,
    HEADER_EXCEPTION_STACKTRACE, HEADER_FAILED_AT, HEADER_ORIGINAL_OFFSET,
    HEADER_ORIGINAL_PARTITION, HEADER_ORIGINAL_TOPIC, HEADER_ORIGINAL_TIMESTAMP,
};
pub use order::{normalize_order_id, Order, OrderIdError, OrderItem, ORDER_ID_MIN_WIDTH, ORDER_ID_PREFIX};
pub use status::{DisplayOpt, Status, StatusMachine, TransitionError};
