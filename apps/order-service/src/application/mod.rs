//! Application-layer orchestration: the read-only query surface over
//! processed orders.

pub mod query_service;

pub use query_service::QueryService;
