//! The consumer's ingest path: connectivity, client construction, backoff,
//! and the core processing engine.

pub mod connectivity;
pub mod consume_engine;
pub mod kafka_consumer;
pub mod retry;

pub use connectivity::ConnectivityMonitor;
pub use consume_engine::{ConsumeEngine, EngineState};
pub use kafka_consumer::{build_consumer, build_dlt_producer};
