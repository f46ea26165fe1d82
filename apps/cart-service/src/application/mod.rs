//! Producer application/orchestration layer.

pub mod order_service;

pub use order_service::{CreateOrderRequest, OrderItemRequest, OrderService, UpdateOrderRequest};
