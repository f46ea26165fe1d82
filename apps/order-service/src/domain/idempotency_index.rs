//! Per-orderId last-processed-offset index (C5).
//!
//! Same-key messages always land in the same partition, so the pair
//! `(orderId, offset)` uniquely identifies a physical delivery; redeliveries
//! after an uncommitted crash reproduce the same offset and are filtered
//! here (spec §4.5).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `(offset, processedAtMillis)` per orderId (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedMessageInfo {
    /// Broker offset of the message that produced the current state.
    pub offset: i64,
    /// When this offset was recorded.
    pub processed_at: DateTime<Utc>,
}

/// Process-local mapping of `orderId → ProcessedMessageInfo`.
///
/// `record` enforces I6 (offset monotonicity per orderId): a lower offset
/// never overwrites a higher one already recorded.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyIndex {
    entries: Arc<RwLock<HashMap<String, ProcessedMessageInfo>>>,
}

impl IdempotencyIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// `alreadyProcessed(orderId, offset)`: true iff an entry exists and its
    /// offset is `>= offset` (spec §4.5).
    #[must_use]
    pub fn already_processed(&self, order_id: &str, offset: i64) -> bool {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(order_id)
            .is_some_and(|info| info.offset >= offset)
    }

    /// `record(orderId, offset)`: sets the entry unless a higher offset is
    /// already recorded (I6 — monotonic).
    pub fn record(&self, order_id: &str, offset: i64) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let should_write = entries.get(order_id).is_none_or(|existing| offset > existing.offset);
        if should_write {
            entries.insert(
                order_id.to_string(),
                ProcessedMessageInfo {
                    offset,
                    processed_at: Utc::now(),
                },
            );
        }
    }

    /// Current recorded offset for `order_id`, if any. Test/diagnostic helper.
    #[must_use]
    pub fn offset_for(&self, order_id: &str) -> Option<i64> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(order_id)
            .map(|info| info.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_order_is_not_already_processed() {
        let index = IdempotencyIndex::new();
        assert!(!index.already_processed("ORD-0001", 0));
    }

    #[test]
    fn recorded_offset_is_already_processed() {
        let index = IdempotencyIndex::new();
        index.record("ORD-0001", 42);
        assert!(index.already_processed("ORD-0001", 42));
        assert!(index.already_processed("ORD-0001", 10));
    }

    #[test]
    fn higher_offset_is_not_yet_processed() {
        let index = IdempotencyIndex::new();
        index.record("ORD-0001", 42);
        assert!(!index.already_processed("ORD-0001", 43));
    }

    #[test]
    fn record_never_overwrites_with_a_lower_offset() {
        let index = IdempotencyIndex::new();
        index.record("ORD-0001", 42);
        index.record("ORD-0001", 10);
        assert_eq!(index.offset_for("ORD-0001"), Some(42));
    }

    #[test]
    fn record_advances_on_higher_offset() {
        let index = IdempotencyIndex::new();
        index.record("ORD-0001", 10);
        index.record("ORD-0001", 42);
        assert_eq!(index.offset_for("ORD-0001"), Some(42));
    }

    #[test]
    fn distinct_keys_do_not_interfere() {
        let index = IdempotencyIndex::new();
        index.record("ORD-0001", 5);
        index.record("ORD-0002", 99);
        assert_eq!(index.offset_for("ORD-0001"), Some(5));
        assert_eq!(index.offset_for("ORD-0002"), Some(99));
    }
}
