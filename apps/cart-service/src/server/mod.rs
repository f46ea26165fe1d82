//! HTTP/JSON API server.

pub mod http;

pub use http::{CartServer, create_router};
