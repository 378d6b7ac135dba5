use rust_decimal::Decimal;

use crate::money::{Money, MoneyError};

use super::{Order, OrderStatus};

/// Share of the total withheld when a paid order is cancelled.
pub const CANCELLATION_FEE_PERCENT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Penalty charged for cancelling `order` in its current status.
///
/// Only paid orders carry a fee; earlier cancellations are free.
pub fn cancellation_fee(order: &Order) -> Result<Money, MoneyError> {
    match order.status() {
        OrderStatus::Paid => order.total_amount().percentage(CANCELLATION_FEE_PERCENT),
        _ => Ok(Money::zero(order.total_amount().currency())),
    }
}
