//! Pre-checks run before a customer is allowed to open a return.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::money::Money;

use super::{PolicyService, ProductCondition, ReturnPolicy, ReturnReason, ReturnWindow};

/// Orders below this amount cannot be returned.
pub const MINIMUM_RETURNABLE_AMOUNT: Decimal = Decimal::TEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityResult {
    pub is_eligible: bool,
    pub reason: String,
    pub days_remaining: i64,
    pub policy: ReturnPolicy,
}

impl EligibilityResult {
    fn rejected(reason: impl Into<String>, policy: ReturnPolicy) -> Self {
        Self {
            is_eligible: false,
            reason: reason.into(),
            days_remaining: 0,
            policy,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EligibilityService {
    policies: PolicyService,
}

impl EligibilityService {
    pub fn new(policies: PolicyService) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &PolicyService {
        &self.policies
    }

    pub fn check_eligibility(
        &self,
        delivery_date: DateTime<Utc>,
        category: &str,
        order_amount: &Money,
        is_custom_product: bool,
    ) -> EligibilityResult {
        self.check_eligibility_at(
            delivery_date,
            category,
            order_amount,
            is_custom_product,
            Utc::now(),
        )
    }

    pub fn check_eligibility_at(
        &self,
        delivery_date: DateTime<Utc>,
        category: &str,
        order_amount: &Money,
        is_custom_product: bool,
        now: DateTime<Utc>,
    ) -> EligibilityResult {
        let policy = self.policies.category_policy(category);
        Self::check_policy_at(
            policy,
            delivery_date,
            category,
            order_amount,
            is_custom_product,
            now,
        )
    }

    /// Runs the same checks against an already chosen policy, such as a VIP
    /// or customer-specific one.
    pub fn check_policy_at(
        policy: ReturnPolicy,
        delivery_date: DateTime<Utc>,
        category: &str,
        order_amount: &Money,
        is_custom_product: bool,
        now: DateTime<Utc>,
    ) -> EligibilityResult {
        if is_custom_product {
            return EligibilityResult::rejected(
                "Custom-made products are not eligible for return",
                ReturnPolicy::non_returnable(),
            );
        }

        if !policy.is_returnable() {
            return EligibilityResult::rejected(
                format!("Products in category '{category}' are not returnable"),
                policy,
            );
        }

        let window = ReturnWindow::new(delivery_date, policy.return_period_days());
        if window.is_expired_at(now) {
            return EligibilityResult::rejected(
                format!(
                    "Return window has expired. Last eligible date was {}",
                    window.last_day()
                ),
                policy,
            );
        }

        if order_amount.amount() < MINIMUM_RETURNABLE_AMOUNT {
            return EligibilityResult::rejected(
                format!(
                    "Order amount is below minimum returnable value ({MINIMUM_RETURNABLE_AMOUNT} {})",
                    order_amount.currency()
                ),
                policy,
            );
        }

        EligibilityResult {
            is_eligible: true,
            reason: "Eligible for return".to_string(),
            days_remaining: window.days_remaining_at(now),
            policy,
        }
    }
}

/// Whether `reason` is acceptable under `policy` for goods in `condition`.
///
/// A change of mind on an opened product is only accepted when the policy
/// charges a restocking fee.
pub fn is_reason_valid(
    reason: ReturnReason,
    policy: &ReturnPolicy,
    condition: Option<ProductCondition>,
) -> bool {
    if !policy.allows(reason) {
        return false;
    }
    if reason == ReturnReason::ChangedMind && condition == Some(ProductCondition::Opened) {
        return policy.has_restocking_fee();
    }
    true
}
