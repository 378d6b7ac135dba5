//! Which return policy applies to a purchase.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::ids::CustomerId;

use super::ReturnPolicy;

const VIP_RETURN_DAYS: u32 = 60;
const HOLIDAY_EXTENSION_DAYS: u32 = 14;
const DEFECT_RETURN_DAYS: u32 = 90;

/// A one-off relaxation granted on top of the regular policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyException {
    /// Purchases made over the holidays get two extra weeks.
    HolidayExtended,
    /// A reported defect allows 90 days, no fee, no packaging requirement.
    DefectReported,
}

impl PolicyException {
    /// Parses the exception codes used by support tooling. Unknown codes
    /// yield `None`, which leaves the base policy untouched.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "holiday_extended" => Some(PolicyException::HolidayExtended),
            "defect_reported" => Some(PolicyException::DefectReported),
            _ => None,
        }
    }
}

/// Resolves return policies.
///
/// Precedence: customer-specific policy, VIP policy, product category,
/// then [`ReturnPolicy::standard`].
#[derive(Debug, Clone)]
pub struct PolicyService {
    category_policies: HashMap<String, ReturnPolicy>,
    customer_policies: HashMap<CustomerId, ReturnPolicy>,
}

impl Default for PolicyService {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyService {
    pub fn new() -> Self {
        let ten = Decimal::TEN;
        let fifteen = Decimal::from_parts(15, 0, 0, false, 0);

        let mut category_policies = HashMap::new();
        category_policies.insert(
            "electronics".to_string(),
            ReturnPolicy::extended()
                .with_fee_percent(ten)
                .with_original_packaging()
                .with_description("Electronics: 30 days, 10% restocking fee, original packaging"),
        );
        category_policies.insert(
            "home_appliances".to_string(),
            ReturnPolicy::extended()
                .with_fee_percent(fifteen)
                .with_original_packaging()
                .with_description("Home appliances: 30 days, 15% restocking fee, original packaging"),
        );
        for category in ["clothing", "shoes", "toys"] {
            category_policies.insert(
                category.to_string(),
                ReturnPolicy::extended().with_description("30 day free returns"),
            );
        }
        for category in ["books", "beauty"] {
            category_policies.insert(
                category.to_string(),
                ReturnPolicy::standard().with_description("14 day free returns"),
            );
        }
        for category in ["food", "perishables", "digital", "custom"] {
            category_policies.insert(
                category.to_string(),
                ReturnPolicy::non_returnable().with_description("Not returnable"),
            );
        }

        Self {
            category_policies,
            customer_policies: HashMap::new(),
        }
    }

    /// Policy for a product category, matched case-insensitively.
    pub fn category_policy(&self, category: &str) -> ReturnPolicy {
        self.category_policies
            .get(&category.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(ReturnPolicy::standard)
    }

    pub fn vip_policy(&self) -> ReturnPolicy {
        ReturnPolicy::fee_free(VIP_RETURN_DAYS).with_description("VIP: 60 day free returns")
    }

    pub fn customer_policy(&self, customer_id: CustomerId) -> Option<&ReturnPolicy> {
        self.customer_policies.get(&customer_id)
    }

    pub fn set_customer_policy(&mut self, customer_id: CustomerId, policy: ReturnPolicy) {
        self.customer_policies.insert(customer_id, policy);
    }

    pub fn policy_for(
        &self,
        category: &str,
        customer_id: Option<CustomerId>,
        is_vip: bool,
    ) -> ReturnPolicy {
        if let Some(policy) = customer_id.and_then(|id| self.customer_policies.get(&id)) {
            return policy.clone();
        }
        if is_vip {
            return self.vip_policy();
        }
        self.category_policy(category)
    }

    pub fn apply_exception(base: &ReturnPolicy, exception: PolicyException) -> ReturnPolicy {
        match exception {
            PolicyException::HolidayExtended => base
                .clone()
                .with_period(base.return_period_days() + HOLIDAY_EXTENSION_DAYS),
            PolicyException::DefectReported => ReturnPolicy::fee_free(DEFECT_RETURN_DAYS)
                .with_allowed_reasons(base.allowed_reasons().iter().copied())
                .with_description("Defect reported: 90 days, no fee"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_category_table() {
        let service = PolicyService::new();

        let electronics = service.category_policy("Electronics");
        assert_eq!(electronics.return_period_days(), 30);
        assert_eq!(electronics.restocking_fee_percent(), dec!(10));
        assert!(electronics.requires_original_packaging());

        assert_eq!(service.category_policy("home_appliances").restocking_fee_percent(), dec!(15));
        assert_eq!(service.category_policy("shoes").return_period_days(), 30);
        assert_eq!(service.category_policy("books").return_period_days(), 14);
        assert!(!service.category_policy("food").is_returnable());
        assert_eq!(service.category_policy("garden"), ReturnPolicy::standard());
    }

    #[test]
    fn test_customer_policy_beats_vip_and_category() {
        let mut service = PolicyService::new();
        let customer = CustomerId::new();
        let special = ReturnPolicy::fee_free(45);
        service.set_customer_policy(customer, special.clone());

        assert_eq!(service.policy_for("electronics", Some(customer), true), special);
        assert_eq!(
            service.policy_for("electronics", Some(CustomerId::new()), true).return_period_days(),
            60
        );
        assert_eq!(
            service.policy_for("books", None, false).return_period_days(),
            14
        );
    }

    #[test]
    fn test_exceptions() {
        let base = PolicyService::new().category_policy("electronics");

        let holiday = PolicyService::apply_exception(&base, PolicyException::HolidayExtended);
        assert_eq!(holiday.return_period_days(), 44);
        assert_eq!(holiday.restocking_fee_percent(), dec!(10));

        let defect = PolicyService::apply_exception(&base, PolicyException::DefectReported);
        assert_eq!(defect.return_period_days(), 90);
        assert!(!defect.has_restocking_fee());
        assert!(!defect.requires_original_packaging());

        assert_eq!(PolicyException::from_code("loyalty_bonus"), None);
    }
}
