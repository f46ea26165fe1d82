//! Deterministic shipping cost derivation (C2).
//!
//! Invoked after sequencing validation and before the `ProcessedOrderStore`
//! write (spec §4.2). No external dependencies, no failure mode.

use order_domain::Order;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Shipping rate applied to `order.total_amount`.
const SHIPPING_RATE: Decimal = dec!(0.02);

/// `shippingCost(order) = order.totalAmount * 0.02` (spec §4.2).
#[must_use]
pub fn shipping_cost(order: &Order) -> Decimal {
    order.total_amount * SHIPPING_RATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use order_domain::Status;
    use rust_decimal_macros::dec;

    fn order_with_total(total: Decimal) -> Order {
        Order {
            order_id: "ORD-0001".to_string(),
            customer_id: "CUST-1".to_string(),
            order_date: Utc::now(),
            items: vec![],
            total_amount: total,
            currency: "USD".to_string(),
            status: Status::New,
        }
    }

    #[test]
    fn two_percent_of_total() {
        assert_eq!(shipping_cost(&order_with_total(dec!(100.00))), dec!(2.0000));
    }

    #[test]
    fn zero_total_yields_zero_shipping() {
        assert_eq!(shipping_cost(&order_with_total(dec!(0.00))), dec!(0.0000));
    }

    #[test]
    fn is_deterministic() {
        let order = order_with_total(dec!(49.99));
        assert_eq!(shipping_cost(&order), shipping_cost(&order));
    }
}
