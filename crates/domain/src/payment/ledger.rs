//! Cross-aggregate rules over a payment and its refunds.

use store::Entity;

use crate::money::{Money, MoneyError};

use super::{Payment, PaymentStatus, Refund};

/// True when any payment in `payments` has completed.
///
/// Used before charging an order again.
pub fn has_completed_payment<'a>(payments: impl IntoIterator<Item = &'a Payment>) -> bool {
    payments
        .into_iter()
        .any(|p| p.status() == PaymentStatus::Completed)
}

/// Refund balance of one payment.
///
/// Refunds belonging to other payments are ignored, so callers can pass an
/// unfiltered list.
#[derive(Debug, Clone, Copy)]
pub struct RefundLedger<'a> {
    payment: &'a Payment,
    refunds: &'a [Refund],
}

impl<'a> RefundLedger<'a> {
    pub fn new(payment: &'a Payment, refunds: &'a [Refund]) -> Self {
        Self { payment, refunds }
    }

    /// Sum of refunds that are processing or completed.
    pub fn total_refunded(&self) -> Result<Money, MoneyError> {
        let currency = self.payment.amount().currency();
        self.refunds
            .iter()
            .filter(|r| r.payment_id() == self.payment.id() && r.status().holds_funds())
            .try_fold(Money::zero(currency), |acc, r| acc.add(&r.refund_amount()))
    }

    /// What can still be refunded.
    pub fn remaining(&self) -> Result<Money, MoneyError> {
        self.payment
            .amount()
            .saturating_subtract(&self.total_refunded()?)
    }

    /// `requested` is positive, the payment completed, and the request fits
    /// in the remaining balance.
    pub fn can_refund(&self, requested: &Money) -> Result<bool, MoneyError> {
        if !self.payment.can_be_refunded() || !requested.is_positive() {
            return Ok(false);
        }
        Ok(requested.try_cmp(&self.remaining()?)?.is_le())
    }
}
