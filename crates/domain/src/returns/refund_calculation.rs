//! How much of a return is paid back, and how.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::{Money, MoneyError};

use super::{ProductCondition, RefundMethod, ReturnError, ReturnPolicy, ReturnReason};

/// Cash refunds above this amount go out by bank transfer instead.
pub const CASH_REFUND_LIMIT: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Share of a damaged item's value withheld.
pub const DAMAGED_DEDUCTION_PERCENT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Share of a used item's value withheld.
pub const USED_DEDUCTION_PERCENT: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// One inspected line of a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectedLine {
    pub condition: ProductCondition,
    pub quantity: u32,
    pub unit_price: Money,
}

impl InspectedLine {
    fn value(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundCalculation {
    pub original_amount: Money,
    pub restocking_fee: Money,
    /// Return shipping plus damage deductions.
    pub deductions: Money,
    pub final_refund_amount: Money,
    pub refund_method: RefundMethod,
    pub notes: Vec<String>,
}

/// Works out the refund for a received return.
///
/// Seller-fault reasons never pay a restocking fee. Return shipping is
/// only charged on a change of mind. The final amount floors at zero.
pub fn calculate(
    total: &Money,
    policy: &ReturnPolicy,
    lines: &[InspectedLine],
    reason: ReturnReason,
    original_shipping_cost: &Money,
    original_payment_method: &str,
) -> Result<RefundCalculation, ReturnError> {
    let zero = Money::zero(total.currency());
    let mut notes = Vec::new();

    let handled = lines.iter().any(|l| {
        matches!(
            l.condition,
            ProductCondition::Opened | ProductCondition::Used
        )
    });
    let restocking_fee = if policy.has_restocking_fee() && !reason.is_seller_fault() && handled {
        notes.push(format!(
            "Restocking fee of {}% applied",
            policy.restocking_fee_percent()
        ));
        total.percentage(policy.restocking_fee_percent())?
    } else {
        zero
    };

    let shipping = if reason == ReturnReason::ChangedMind {
        notes.push("Return shipping cost deducted".to_string());
        *original_shipping_cost
    } else {
        zero
    };

    let damage = lines.iter().try_fold(zero, |acc, line| {
        let percent = match line.condition {
            ProductCondition::Damaged => DAMAGED_DEDUCTION_PERCENT,
            ProductCondition::Used => USED_DEDUCTION_PERCENT,
            _ => return Ok::<_, MoneyError>(acc),
        };
        acc.add(&line.value().percentage(percent)?)
    })?;
    if !damage.is_zero() {
        notes.push(format!("Damage deduction of {damage}"));
    }

    let deductions = shipping.add(&damage)?;
    let final_refund_amount = total
        .saturating_subtract(&restocking_fee)?
        .saturating_subtract(&deductions)?;

    Ok(RefundCalculation {
        original_amount: *total,
        restocking_fee,
        deductions,
        final_refund_amount,
        refund_method: recommend_refund_method(original_payment_method, &final_refund_amount),
        notes,
    })
}

/// Picks how to send the money back given how the customer paid.
pub fn recommend_refund_method(original_payment_method: &str, amount: &Money) -> RefundMethod {
    match original_payment_method.trim().to_lowercase().as_str() {
        "card" | "credit_card" | "debit_card" => RefundMethod::OriginalPaymentMethod,
        "bank_transfer" => RefundMethod::BankTransfer,
        "cash" if amount.amount() <= CASH_REFUND_LIMIT => RefundMethod::Cash,
        "cash" => RefundMethod::BankTransfer,
        _ => RefundMethod::OriginalPaymentMethod,
    }
}

/// A refund must be in the original currency and between zero and the
/// original amount.
pub fn validate_refund_amount(refund: &Money, original: &Money) -> bool {
    refund
        .try_cmp(original)
        .map(|ordering| ordering.is_le())
        .unwrap_or(false)
}
