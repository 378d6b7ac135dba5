//! Fraud screening rules for new payments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Amounts above this are flagged for review.
pub const LARGE_AMOUNT_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Amounts above this are blocked outright.
pub const CRITICAL_AMOUNT_THRESHOLD: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

/// More payments than this from one email inside the window is suspicious.
pub const RAPID_PAYMENT_LIMIT: usize = 5;

pub const RAPID_PAYMENT_WINDOW_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FraudRiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudCheckResult {
    pub risk_level: FraudRiskLevel,
    pub reasons: Vec<String>,
    pub should_block: bool,
}

impl FraudCheckResult {
    pub fn is_suspicious(&self) -> bool {
        !self.reasons.is_empty()
    }
}

/// Scores a payment of `amount` given how many payments the same customer
/// email made in the last [`RAPID_PAYMENT_WINDOW_MINUTES`].
///
/// Later rules override the risk level of earlier ones; only the critical
/// amount rule blocks.
pub fn assess_payment(amount: &Money, recent_payments: usize) -> FraudCheckResult {
    let mut reasons = Vec::new();
    let mut risk_level = FraudRiskLevel::Low;

    if amount.amount() > LARGE_AMOUNT_THRESHOLD {
        reasons.push("Large payment amount detected".to_string());
        risk_level = FraudRiskLevel::Medium;
    }

    if recent_payments > RAPID_PAYMENT_LIMIT {
        reasons.push("Multiple rapid payments detected".to_string());
        risk_level = FraudRiskLevel::High;
    }

    let should_block = amount.amount() > CRITICAL_AMOUNT_THRESHOLD;
    if should_block {
        reasons.push("Critical amount threshold exceeded".to_string());
        risk_level = FraudRiskLevel::Critical;
    }

    FraudCheckResult {
        risk_level,
        reasons,
        should_block,
    }
}
