//! Dead-letter / file-fallback failure record shape (spec §3 `FailureRecord`).
//!
//! Both services attach the same header names to messages they route to
//! `ORDERS.DLT`, so out-of-band replay tooling only has to learn one schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header key: the topic the message originally targeted.
pub const HEADER_ORIGINAL_TOPIC: &str = "original-topic";
/// Header key: the partition the message originally landed on (consumer only).
pub const HEADER_ORIGINAL_PARTITION: &str = "original-partition";
/// Header key: the offset the message originally occupied (consumer only).
pub const HEADER_ORIGINAL_OFFSET: &str = "original-offset";
/// Header key: the original produce/consume timestamp.
pub const HEADER_ORIGINAL_TIMESTAMP: &str = "original-timestamp";
/// Header key: the Rust type name of the failure.
pub const HEADER_EXCEPTION_CLASS: &str = "exception-class";
/// Header key: the failure's display message.
pub const HEADER_EXCEPTION_MESSAGE: &str = "exception-message";
/// Header key: a best-effort backtrace/context string.
pub const HEADER_EXCEPTION_STACKTRACE: &str = "exception-stacktrace";
/// Header key: when the failure was recorded.
pub const HEADER_FAILED_AT: &str = "failed-at";

/// Metadata describing why a message is being routed to the DLT or file sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureMetadata {
    /// Topic the message originally targeted.
    pub original_topic: String,
    /// Partition the message originally landed on, if known (consumer side).
    pub original_partition: Option<i32>,
    /// Offset the message originally occupied, if known (consumer side).
    pub original_offset: Option<i64>,
    /// Original produce/consume timestamp.
    pub original_timestamp: DateTime<Utc>,
    /// Rust type name of the failure that caused the routing.
    pub exception_class: String,
    /// Display message of the failure.
    pub exception_message: String,
    /// Best-effort stack/context string.
    pub exception_stacktrace: String,
    /// When this failure was recorded.
    pub failed_at: DateTime<Utc>,
}

impl FailureMetadata {
    /// Render as the `(key, value)` header pairs a Kafka record expects.
    #[must_use]
    pub fn as_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            (HEADER_ORIGINAL_TOPIC, self.original_topic.clone()),
            (HEADER_ORIGINAL_TIMESTAMP, self.original_timestamp.to_rfc3339()),
            (HEADER_EXCEPTION_CLASS, self.exception_class.clone()),
            (HEADER_EXCEPTION_MESSAGE, self.exception_message.clone()),
            (HEADER_EXCEPTION_STACKTRACE, self.exception_stacktrace.clone()),
            (HEADER_FAILED_AT, self.failed_at.to_rfc3339()),
        ];
        if let Some(partition) = self.original_partition {
            headers.push((HEADER_ORIGINAL_PARTITION, partition.to_string()));
        }
        if let Some(offset) = self.original_offset {
            headers.push((HEADER_ORIGINAL_OFFSET, offset.to_string()));
        }
        headers
    }
}

/// A full failure record: the original payload plus its metadata (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Message key, preserved as the original `orderId`.
    pub key: String,
    /// Original serialized payload, unchanged.
    pub payload: String,
    /// Failure metadata headers.
    pub metadata: FailureMetadata,
}

impl FailureRecord {
    /// Render as a single line for the append-only file fallback sink
    /// (spec §4.7, §6): `FAILED | kind=<kind> | orderId=<id> | payload=<json>`.
    #[must_use]
    pub fn as_file_line(&self, kind: &str) -> String {
        format!(
            "FAILED | kind={kind} | orderId={} | payload={}",
            self.key, self.payload
        )
    }
}
