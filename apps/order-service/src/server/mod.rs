//! HTTP surface.

pub mod http;

pub use http::{OrderServer, create_router};
