//! Broker-facing modules: connectivity, retry, and the publish engine.

pub mod connectivity;
pub mod kafka_producer;
pub mod publish_engine;
pub mod retry;

pub use connectivity::ConnectivityMonitor;
pub use publish_engine::{FailureKind, PublishEngine, PublishOutcome};
