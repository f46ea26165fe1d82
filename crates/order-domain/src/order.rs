//! The `Order` wire payload / in-memory entity, and orderId normalization.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::Status;

/// Canonical prefix for normalized order ids.
pub const ORDER_ID_PREFIX: &str = "ORD-";

/// Minimum zero-padded width of the hex portion of a normalized order id.
pub const ORDER_ID_MIN_WIDTH: usize = 4;

/// A single line item within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item identifier.
    pub item_id: String,
    /// Quantity ordered. Must be positive.
    pub quantity: u32,
    /// Unit price. Must be non-negative.
    pub price: Decimal,
}

/// The order entity (spec §3). Immutable after construction — updates
/// produce a new value rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Normalized order id, e.g. `ORD-00A1`.
    pub order_id: String,
    /// Customer identifier.
    pub customer_id: String,
    /// Order creation timestamp (UTC).
    pub order_date: DateTime<Utc>,
    /// Line items, in the order the customer specified them.
    pub items: Vec<OrderItem>,
    /// Total monetary amount. Non-negative.
    pub total_amount: Decimal,
    /// ISO 4217-ish currency code.
    pub currency: String,
    /// Current status.
    pub status: Status,
}

impl Order {
    /// Sum of `quantity * price` across all items.
    #[must_use]
    pub fn compute_total(items: &[OrderItem]) -> Decimal {
        items
            .iter()
            .map(|item| Decimal::from(item.quantity) * item.price)
            .sum()
    }
}

/// Error normalizing a raw order id.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum OrderIdError {
    /// The input was empty.
    #[error("order id must not be empty")]
    Empty,
    /// The input contained non-hex characters.
    #[error("order id '{0}' is not a valid hex string")]
    NotHex(String),
}

/// Normalize a raw order id into the canonical `ORD-####` form.
///
/// Accepts any non-empty, case-insensitive hex string (with or without the
/// `ORD-` prefix already applied) and normalizes to `ORD-` + uppercase hex,
/// left-padded with zeros to [`ORDER_ID_MIN_WIDTH`]. Every producer and
/// consumer code path must call this before keying a store or a broker
/// message (spec §6).
///
/// # Errors
///
/// Returns [`OrderIdError`] if the input is empty or contains non-hex
/// characters once any existing `ORD-`/`ord-` prefix is stripped.
pub fn normalize_order_id(raw: &str) -> Result<String, OrderIdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OrderIdError::Empty);
    }

    let stripped = trimmed
        .strip_prefix(ORDER_ID_PREFIX)
        .or_else(|| trimmed.strip_prefix("ord-"))
        .unwrap_or(trimmed);

    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(OrderIdError::NotHex(raw.to_string()));
    }

    let upper = stripped.to_ascii_uppercase();
    let padded = if upper.len() >= ORDER_ID_MIN_WIDTH {
        upper
    } else {
        format!("{:0>width$}", upper, width = ORDER_ID_MIN_WIDTH)
    };

    Ok(format!("{ORDER_ID_PREFIX}{padded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn normalizes_bare_hex() {
        assert_eq!(normalize_order_id("a1").unwrap(), "ORD-00A1");
    }

    #[test]
    fn normalizes_already_prefixed_id() {
        assert_eq!(normalize_order_id("ORD-a1").unwrap(), "ORD-00A1");
        assert_eq!(normalize_order_id("ord-A1").unwrap(), "ORD-00A1");
    }

    #[test]
    fn leaves_wide_ids_unpadded_further() {
        assert_eq!(normalize_order_id("deadbeef").unwrap(), "ORD-DEADBEEF");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(normalize_order_id(""), Err(OrderIdError::Empty));
        assert_eq!(normalize_order_id("   "), Err(OrderIdError::Empty));
    }

    #[test]
    fn rejects_non_hex() {
        assert!(matches!(
            normalize_order_id("zzzz"),
            Err(OrderIdError::NotHex(_))
        ));
        assert!(matches!(
            normalize_order_id("ORD-"),
            Err(OrderIdError::NotHex(_))
        ));
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_order_id("a1").unwrap();
        let twice = normalize_order_id(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn compute_total_sums_quantity_times_price() {
        let items = vec![
            OrderItem {
                item_id: "sku-1".to_string(),
                quantity: 2,
                price: dec!(10.50),
            },
            OrderItem {
                item_id: "sku-2".to_string(),
                quantity: 1,
                price: dec!(5.00),
            },
        ];
        assert_eq!(Order::compute_total(&items), dec!(26.00));
    }
}
