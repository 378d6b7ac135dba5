//! Value objects for the returns context.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::AggregateId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::ProductId;
use crate::money::Money;

use super::ReturnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnReason {
    DefectiveProduct,
    WrongItemReceived,
    NotAsDescribed,
    ChangedMind,
    SizeIssue,
    QualityIssue,
    DamagedInTransit,
    Other,
}

impl ReturnReason {
    pub const ALL: [ReturnReason; 8] = [
        ReturnReason::DefectiveProduct,
        ReturnReason::WrongItemReceived,
        ReturnReason::NotAsDescribed,
        ReturnReason::ChangedMind,
        ReturnReason::SizeIssue,
        ReturnReason::QualityIssue,
        ReturnReason::DamagedInTransit,
        ReturnReason::Other,
    ];

    /// The seller is at fault: no restocking fee, no approval ceiling.
    pub fn is_seller_fault(&self) -> bool {
        matches!(
            self,
            ReturnReason::DefectiveProduct
                | ReturnReason::DamagedInTransit
                | ReturnReason::WrongItemReceived
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnReason::DefectiveProduct => "DefectiveProduct",
            ReturnReason::WrongItemReceived => "WrongItemReceived",
            ReturnReason::NotAsDescribed => "NotAsDescribed",
            ReturnReason::ChangedMind => "ChangedMind",
            ReturnReason::SizeIssue => "SizeIssue",
            ReturnReason::QualityIssue => "QualityIssue",
            ReturnReason::DamagedInTransit => "DamagedInTransit",
            ReturnReason::Other => "Other",
        }
    }
}

impl std::fmt::Display for ReturnReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a returned product as found at inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCondition {
    /// Unopened, original packaging.
    Intact,
    Opened,
    Used,
    Damaged,
    Defective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RefundMethod {
    #[default]
    OriginalPaymentMethod,
    BankTransfer,
    StoreCredit,
    Cash,
}

impl std::fmt::Display for RefundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefundMethod::OriginalPaymentMethod => "OriginalPaymentMethod",
            RefundMethod::BankTransfer => "BankTransfer",
            RefundMethod::StoreCredit => "StoreCredit",
            RefundMethod::Cash => "Cash",
        };
        f.write_str(s)
    }
}

/// Terms under which a product can be returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPolicy {
    return_period_days: u32,
    is_returnable: bool,
    restocking_fee_percent: Decimal,
    allowed_reasons: Vec<ReturnReason>,
    requires_original_packaging: bool,
    description: String,
}

impl ReturnPolicy {
    /// A returnable policy accepting every reason.
    pub fn new(return_period_days: u32, restocking_fee_percent: Decimal) -> Result<Self, ReturnError> {
        if restocking_fee_percent < Decimal::ZERO || restocking_fee_percent > Decimal::ONE_HUNDRED {
            return Err(ReturnError::InvalidFeePercentage(restocking_fee_percent));
        }
        Ok(Self {
            return_period_days,
            is_returnable: true,
            restocking_fee_percent,
            allowed_reasons: ReturnReason::ALL.to_vec(),
            requires_original_packaging: false,
            description: String::new(),
        })
    }

    /// 14 days, no fee.
    pub fn standard() -> Self {
        Self::fee_free(14)
    }

    /// 30 days, no fee.
    pub fn extended() -> Self {
        Self::fee_free(30)
    }

    pub fn non_returnable() -> Self {
        Self {
            is_returnable: false,
            ..Self::fee_free(0)
        }
    }

    pub(crate) fn fee_free(return_period_days: u32) -> Self {
        Self {
            return_period_days,
            is_returnable: true,
            restocking_fee_percent: Decimal::ZERO,
            allowed_reasons: ReturnReason::ALL.to_vec(),
            requires_original_packaging: false,
            description: String::new(),
        }
    }

    pub fn with_allowed_reasons(mut self, reasons: impl IntoIterator<Item = ReturnReason>) -> Self {
        self.allowed_reasons = reasons.into_iter().collect();
        self
    }

    pub fn with_original_packaging(mut self) -> Self {
        self.requires_original_packaging = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// For built-in policies whose fee is a known constant in range.
    pub(crate) fn with_fee_percent(mut self, restocking_fee_percent: Decimal) -> Self {
        debug_assert!(restocking_fee_percent >= Decimal::ZERO);
        debug_assert!(restocking_fee_percent <= Decimal::ONE_HUNDRED);
        self.restocking_fee_percent = restocking_fee_percent;
        self
    }

    pub(crate) fn with_period(mut self, return_period_days: u32) -> Self {
        self.return_period_days = return_period_days;
        self
    }

    pub fn return_period_days(&self) -> u32 {
        self.return_period_days
    }

    pub fn is_returnable(&self) -> bool {
        self.is_returnable
    }

    pub fn restocking_fee_percent(&self) -> Decimal {
        self.restocking_fee_percent
    }

    pub fn has_restocking_fee(&self) -> bool {
        self.restocking_fee_percent > Decimal::ZERO
    }

    pub fn allowed_reasons(&self) -> &[ReturnReason] {
        &self.allowed_reasons
    }

    pub fn allows(&self, reason: ReturnReason) -> bool {
        self.allowed_reasons.contains(&reason)
    }

    pub fn requires_original_packaging(&self) -> bool {
        self.requires_original_packaging
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Return Merchandise Authorization code, `RMA-YYYYMMDD-XXXXXXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RmaCode(String);

impl RmaCode {
    pub fn generate(return_id: AggregateId, requested_at: DateTime<Utc>) -> Self {
        Self(format!(
            "RMA-{}-{}",
            requested_at.format("%Y%m%d"),
            return_id.short_code()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RmaCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How long after delivery a return may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnWindow {
    delivery_date: DateTime<Utc>,
    period_days: u32,
    expires_at: DateTime<Utc>,
}

impl ReturnWindow {
    pub fn new(delivery_date: DateTime<Utc>, period_days: u32) -> Self {
        Self {
            delivery_date,
            period_days,
            expires_at: delivery_date + Duration::days(i64::from(period_days)),
        }
    }

    pub fn delivery_date(&self) -> DateTime<Utc> {
        self.delivery_date
    }

    pub fn period_days(&self) -> u32 {
        self.period_days
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn last_day(&self) -> NaiveDate {
        self.expires_at.date_naive()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whole days left, zero once expired.
    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days().max(0)
    }

    pub fn ensure_open_at(&self, now: DateTime<Utc>) -> Result<(), ReturnError> {
        if self.is_expired_at(now) {
            return Err(ReturnError::WindowExpired {
                last_day: self.last_day(),
            });
        }
        Ok(())
    }
}

/// A product line in a return, with what the warehouse found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    product_id: ProductId,
    product_name: String,
    quantity_requested: u32,
    quantity_received: u32,
    unit_price: Money,
    received_condition: Option<ProductCondition>,
    condition_notes: String,
    acceptable_for_resale: bool,
}

impl ReturnItem {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity_requested: u32,
        unit_price: Money,
    ) -> Result<Self, ReturnError> {
        let product_name = product_name.into();
        if product_name.trim().is_empty() {
            return Err(ReturnError::Required("product name"));
        }
        if quantity_requested == 0 {
            return Err(ReturnError::InvalidQuantity {
                quantity: quantity_requested,
            });
        }
        Ok(Self {
            product_id,
            product_name,
            quantity_requested,
            quantity_received: 0,
            unit_price,
            received_condition: None,
            condition_notes: String::new(),
            acceptable_for_resale: false,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity_requested(&self) -> u32 {
        self.quantity_requested
    }

    pub fn quantity_received(&self) -> u32 {
        self.quantity_received
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn total_price(&self) -> Money {
        self.unit_price.times(self.quantity_requested)
    }

    pub fn received_condition(&self) -> Option<ProductCondition> {
        self.received_condition
    }

    pub fn condition_notes(&self) -> &str {
        &self.condition_notes
    }

    pub fn acceptable_for_resale(&self) -> bool {
        self.acceptable_for_resale
    }

    pub fn is_inspected(&self) -> bool {
        self.received_condition.is_some()
    }

    pub fn is_fully_received(&self) -> bool {
        self.quantity_received == self.quantity_requested
    }

    pub(crate) fn mark_received(&mut self, received: &ReceivedItem) -> Result<(), ReturnError> {
        if received.quantity > self.quantity_requested {
            return Err(ReturnError::ReceivedExceedsRequested {
                product_id: self.product_id,
                requested: self.quantity_requested,
                received: received.quantity,
            });
        }
        self.quantity_received = received.quantity;
        self.received_condition = Some(received.condition);
        self.condition_notes = received.notes.clone();
        self.acceptable_for_resale = received.acceptable_for_resale;
        Ok(())
    }
}

/// Inspection result for one product, reported when goods arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub condition: ProductCondition,
    pub notes: String,
    pub acceptable_for_resale: bool,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_rma_code_format() {
        let id = AggregateId::from_uuid(Uuid::parse_str("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap());
        let at = Utc.with_ymd_and_hms(2025, 11, 7, 10, 0, 0).unwrap();

        assert_eq!(RmaCode::generate(id, at).as_str(), "RMA-20251107-3FA85F64");
    }

    #[test]
    fn test_window_expiry_and_days_remaining() {
        let delivered = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let window = ReturnWindow::new(delivered, 14);

        assert_eq!(window.last_day(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(window.days_remaining_at(delivered + Duration::days(4)), 10);
        assert!(!window.is_expired_at(window.expires_at()));
        assert!(window.is_expired_at(window.expires_at() + Duration::seconds(1)));
        assert_eq!(window.days_remaining_at(delivered + Duration::days(30)), 0);
    }

    #[test]
    fn test_expired_window_message() {
        let delivered = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let err = ReturnWindow::new(delivered, 14)
            .ensure_open_at(delivered + Duration::days(20))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Return window has expired. Last day for return was 2025-03-15"
        );
    }

    #[test]
    fn test_policy_rejects_fee_above_hundred() {
        assert_eq!(
            ReturnPolicy::new(30, dec!(101)),
            Err(ReturnError::InvalidFeePercentage(dec!(101)))
        );
        assert!(!ReturnPolicy::non_returnable().is_returnable());
        assert!(ReturnPolicy::standard().allows(ReturnReason::ChangedMind));
    }

    #[test]
    fn test_receiving_more_than_requested_fails() {
        let mut item =
            ReturnItem::new(ProductId::new(), "Lamp", 2, Money::ron(dec!(80)).unwrap()).unwrap();
        let received = ReceivedItem {
            product_id: item.product_id(),
            quantity: 3,
            condition: ProductCondition::Intact,
            notes: String::new(),
            acceptable_for_resale: true,
        };

        assert!(matches!(
            item.mark_received(&received),
            Err(ReturnError::ReceivedExceedsRequested { .. })
        ));
        assert!(!item.is_inspected());
    }
}
