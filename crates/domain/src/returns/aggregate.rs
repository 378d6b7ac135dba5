//! Return aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::{Entity, Version};

use crate::aggregate::{Aggregate, PendingEvents, transact};
use crate::error::InvariantViolation;
use crate::ids::{CustomerId, ProductId, UserId};
use crate::money::{Money, MoneyError};

use super::{
    ReceivedItem, RefundMethod, ReturnAcceptedData, ReturnApprovedData, ReturnCancelledData,
    ReturnCompletedData, ReturnError, ReturnEvent, ReturnItem, ReturnPolicy, ReturnReason,
    ReturnReceivedData, ReturnRejectedData, ReturnRequestedData, ReturnStatus, ReturnWindow,
    RmaCode,
};

/// Everything a customer submits when asking to send products back.
#[derive(Debug, Clone)]
pub struct ReturnRequest {
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub delivery_date: DateTime<Utc>,
    pub items: Vec<ReturnItem>,
    pub reason: ReturnReason,
    pub description: String,
    pub policy: ReturnPolicy,
}

/// A return merchandise authorization.
///
/// The refund amount is fixed at approval (total minus any restocking fee)
/// and never exceeds the total of the returned items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Return {
    id: AggregateId,

    #[serde(default)]
    version: Version,

    order_id: AggregateId,
    customer_id: CustomerId,
    customer_name: String,
    customer_email: String,
    rma_code: RmaCode,
    status: ReturnStatus,
    reason: ReturnReason,
    description: String,
    items: Vec<ReturnItem>,
    total_amount: Money,
    restocking_fee: Money,
    refund_amount: Money,
    refund_method: RefundMethod,
    refund_reference: Option<String>,
    policy: ReturnPolicy,
    window: ReturnWindow,
    tracking_number: Option<String>,
    warehouse_location: Option<String>,
    rejection_reason: Option<String>,
    requested_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    accepted_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pending: PendingEvents<ReturnEvent>,
}

impl Entity for Return {
    fn entity_type() -> &'static str {
        "Return"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}

impl Aggregate for Return {
    type Event = ReturnEvent;
    type Error = ReturnError;

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |message: String| InvariantViolation::new(Self::entity_type(), message);

        if self.items.is_empty() {
            return Err(violation("return has no items".to_string()));
        }
        for item in &self.items {
            if item.quantity_requested() == 0 {
                return Err(violation(format!(
                    "product {} has zero requested quantity",
                    item.product_id()
                )));
            }
            if item.quantity_received() > item.quantity_requested() {
                return Err(violation(format!(
                    "product {} received {} of {} requested",
                    item.product_id(),
                    item.quantity_received(),
                    item.quantity_requested()
                )));
            }
        }

        let expected = total_of(&self.items).map_err(|e| violation(e.to_string()))?;
        if expected != self.total_amount {
            return Err(violation(format!(
                "total {} does not match items {}",
                self.total_amount, expected
            )));
        }
        let deductions = [
            ("refund", self.refund_amount),
            ("restocking fee", self.restocking_fee),
        ];
        for (label, amount) in deductions {
            let exceeds = amount
                .try_cmp(&self.total_amount)
                .map_err(|e| violation(e.to_string()))?
                .is_gt();
            if exceeds {
                return Err(violation(format!(
                    "{label} {amount} exceeds total {}",
                    self.total_amount
                )));
            }
        }
        Ok(())
    }

    fn pending(&self) -> &PendingEvents<ReturnEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<ReturnEvent> {
        &mut self.pending
    }
}

impl Return {
    pub fn order_id(&self) -> AggregateId {
        self.order_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    pub fn rma_code(&self) -> &RmaCode {
        &self.rma_code
    }

    pub fn status(&self) -> ReturnStatus {
        self.status
    }

    pub fn reason(&self) -> ReturnReason {
        self.reason
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn items(&self) -> &[ReturnItem] {
        &self.items
    }

    pub fn item(&self, product_id: ProductId) -> Option<&ReturnItem> {
        self.items.iter().find(|i| i.product_id() == product_id)
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn restocking_fee(&self) -> Money {
        self.restocking_fee
    }

    pub fn refund_amount(&self) -> Money {
        self.refund_amount
    }

    pub fn refund_method(&self) -> RefundMethod {
        self.refund_method
    }

    pub fn refund_reference(&self) -> Option<&str> {
        self.refund_reference.as_deref()
    }

    pub fn policy(&self) -> &ReturnPolicy {
        &self.policy
    }

    pub fn window(&self) -> &ReturnWindow {
        &self.window
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn warehouse_location(&self) -> Option<&str> {
        self.warehouse_location.as_deref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn all_items_received(&self) -> bool {
        self.items.iter().all(ReturnItem::is_fully_received)
    }

    pub fn all_items_inspected(&self) -> bool {
        self.items.iter().all(ReturnItem::is_inspected)
    }

    pub fn request(request: ReturnRequest) -> Result<Self, ReturnError> {
        Self::request_at(request, Utc::now())
    }

    /// Opens a return as of `now`.
    ///
    /// Checks run in a fixed order: window, returnability, reason, items.
    pub fn request_at(request: ReturnRequest, now: DateTime<Utc>) -> Result<Self, ReturnError> {
        let ReturnRequest {
            order_id,
            customer_id,
            customer_name,
            customer_email,
            delivery_date,
            items,
            reason,
            description,
            policy,
        } = request;

        if customer_name.trim().is_empty() {
            return Err(ReturnError::Required("customer name"));
        }
        if customer_email.trim().is_empty() {
            return Err(ReturnError::Required("customer email"));
        }

        let window = ReturnWindow::new(delivery_date, policy.return_period_days());
        window.ensure_open_at(now)?;
        if !policy.is_returnable() {
            return Err(ReturnError::NotReturnable);
        }
        if !policy.allows(reason) {
            return Err(ReturnError::ReasonNotAllowed { reason });
        }
        if items.is_empty() {
            return Err(ReturnError::NoItems);
        }

        let total_amount = total_of(&items)?;
        let zero = Money::zero(total_amount.currency());
        let id = AggregateId::new();
        let rma_code = RmaCode::generate(id, now);

        let mut ret = Self {
            id,
            version: Version::initial(),
            order_id,
            customer_id,
            customer_name,
            customer_email,
            rma_code,
            status: ReturnStatus::Requested,
            reason,
            description,
            items,
            total_amount,
            restocking_fee: zero,
            refund_amount: zero,
            refund_method: RefundMethod::default(),
            refund_reference: None,
            policy,
            window,
            tracking_number: None,
            warehouse_location: None,
            rejection_reason: None,
            requested_at: now,
            approved_at: None,
            received_at: None,
            accepted_at: None,
            completed_at: None,
            pending: PendingEvents::default(),
        };
        ret.check_invariants()?;

        let requested = ReturnEvent::ReturnRequested(ReturnRequestedData {
            return_id: ret.id,
            order_id,
            customer_id,
            customer_email: ret.customer_email.clone(),
            items: ret.items.clone(),
            reason,
            description: ret.description.clone(),
            total_amount,
            rma_code: ret.rma_code.clone(),
            requested_at: now,
        });
        ret.pending.extend([requested]);
        Ok(ret)
    }

    /// Approves the return and fixes the refund amount.
    ///
    /// The policy's restocking fee is deducted only when `apply_restocking_fee`
    /// is set and the policy charges one.
    pub fn approve(
        &mut self,
        approved_by: UserId,
        approver_name: impl Into<String>,
        notes: impl Into<String>,
        apply_restocking_fee: bool,
    ) -> Result<Vec<ReturnEvent>, ReturnError> {
        self.ensure(self.status.can_approve(), "approve")?;

        let fee_percent = self.policy.restocking_fee_percent();
        let restocking_fee = if apply_restocking_fee && self.policy.has_restocking_fee() {
            self.total_amount.percentage(fee_percent)?
        } else {
            Money::zero(self.total_amount.currency())
        };
        let refund_amount = self.total_amount.subtract(&restocking_fee)?;

        let approver_name = approver_name.into();
        let notes = notes.into();
        let now = Utc::now();
        transact(self, |ret| {
            ret.status = ReturnStatus::Approved;
            ret.restocking_fee = restocking_fee;
            ret.refund_amount = refund_amount;
            ret.approved_at = Some(now);
            Ok(vec![ReturnEvent::ReturnApproved(ReturnApprovedData {
                return_id: ret.id,
                order_id: ret.order_id,
                approved_by,
                approver_name,
                approved_amount: refund_amount,
                restocking_fee,
                restocking_fee_percent: if restocking_fee.is_zero() {
                    Decimal::ZERO
                } else {
                    fee_percent
                },
                product_ids: ret.product_ids(),
                rma_code: ret.rma_code.clone(),
                notes,
                approved_at: now,
            })])
        })
    }

    /// Records the goods arriving at the warehouse with their inspection
    /// results. Fails as a whole if any line refers to an unknown product.
    pub fn receive_products(
        &mut self,
        received_by: UserId,
        receiver_name: impl Into<String>,
        received: Vec<ReceivedItem>,
        tracking_number: impl Into<String>,
        warehouse_location: impl Into<String>,
        inspection_notes: impl Into<String>,
    ) -> Result<Vec<ReturnEvent>, ReturnError> {
        self.ensure(self.status.can_receive(), "receive products for")?;
        if received.is_empty() {
            return Err(ReturnError::Required("received items"));
        }

        let receiver_name = receiver_name.into();
        let tracking_number = tracking_number.into();
        let warehouse_location = warehouse_location.into();
        let inspection_notes = inspection_notes.into();
        let now = Utc::now();
        transact(self, |ret| {
            for line in &received {
                let item = ret
                    .items
                    .iter_mut()
                    .find(|i| i.product_id() == line.product_id)
                    .ok_or(ReturnError::ItemNotInReturn {
                        product_id: line.product_id,
                    })?;
                item.mark_received(line)?;
            }
            ret.status = ReturnStatus::Received;
            ret.tracking_number = Some(tracking_number.clone());
            ret.warehouse_location = Some(warehouse_location.clone());
            ret.received_at = Some(now);
            Ok(vec![ReturnEvent::ReturnReceived(ReturnReceivedData {
                return_id: ret.id,
                order_id: ret.order_id,
                received_by,
                receiver_name,
                items: ret.items.clone(),
                tracking_number,
                warehouse_location,
                inspection_notes,
                all_items_received: ret.all_items_received(),
                received_at: now,
            })])
        })
    }

    /// Accepts inspected goods. The refund paid is the amount fixed at
    /// approval.
    pub fn accept_and_process_refund(
        &mut self,
        accepted_by: UserId,
        accepter_name: impl Into<String>,
        refund_method: RefundMethod,
        refund_reference: impl Into<String>,
        notes: impl Into<String>,
        inventory_updated: bool,
    ) -> Result<Vec<ReturnEvent>, ReturnError> {
        self.ensure(self.status.can_accept(), "accept")?;
        if !self.all_items_inspected() {
            return Err(ReturnError::ItemsNotInspected);
        }

        let accepter_name = accepter_name.into();
        let refund_reference = refund_reference.into();
        let notes = notes.into();
        let now = Utc::now();
        transact(self, |ret| {
            ret.status = ReturnStatus::Accepted;
            ret.refund_method = refund_method;
            ret.refund_reference =
                (!refund_reference.trim().is_empty()).then(|| refund_reference.clone());
            ret.accepted_at = Some(now);
            Ok(vec![ReturnEvent::ReturnAccepted(ReturnAcceptedData {
                return_id: ret.id,
                order_id: ret.order_id,
                customer_id: ret.customer_id,
                accepted_by,
                accepter_name,
                total_amount: ret.total_amount,
                restocking_fee: ret.restocking_fee,
                refund_amount: ret.refund_amount,
                refund_method,
                refund_reference,
                product_ids: ret.product_ids(),
                inventory_updated,
                notes,
                accepted_at: now,
            })])
        })
    }

    pub fn reject(
        &mut self,
        rejected_by: UserId,
        rejector_name: impl Into<String>,
        reason: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Result<Vec<ReturnEvent>, ReturnError> {
        self.ensure(self.status.can_reject(), "reject")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ReturnError::Required("rejection reason"));
        }

        let rejector_name = rejector_name.into();
        let explanation = explanation.into();
        let now = Utc::now();
        transact(self, |ret| {
            ret.status = ReturnStatus::Rejected;
            ret.rejection_reason = Some(reason.clone());
            Ok(vec![ReturnEvent::ReturnRejected(ReturnRejectedData {
                return_id: ret.id,
                order_id: ret.order_id,
                rejected_by,
                rejector_name,
                reason,
                explanation,
                customer_notified: true,
                rejected_at: now,
            })])
        })
    }

    /// Withdraws the return before the goods reach the warehouse.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<Vec<ReturnEvent>, ReturnError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ReturnError::Required("cancellation reason"));
        }

        let now = Utc::now();
        transact(self, |ret| {
            ret.status = ReturnStatus::Cancelled;
            Ok(vec![ReturnEvent::ReturnCancelled(ReturnCancelledData {
                return_id: ret.id,
                order_id: ret.order_id,
                reason,
                cancelled_at: now,
            })])
        })
    }

    /// Closes the return once the refund has been paid out.
    pub fn complete(
        &mut self,
        refund_reference: impl Into<String>,
    ) -> Result<Vec<ReturnEvent>, ReturnError> {
        self.ensure(self.status.can_complete(), "complete")?;
        let refund_reference = refund_reference.into();
        if refund_reference.trim().is_empty() {
            return Err(ReturnError::Required("refund reference"));
        }

        let now = Utc::now();
        transact(self, |ret| {
            ret.status = ReturnStatus::Completed;
            ret.refund_reference = Some(refund_reference.clone());
            ret.completed_at = Some(now);
            Ok(vec![ReturnEvent::ReturnCompleted(ReturnCompletedData {
                return_id: ret.id,
                order_id: ret.order_id,
                refund_amount: ret.refund_amount,
                refund_method: ret.refund_method,
                refund_reference,
                completed_at: now,
            })])
        })
    }

    fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(ReturnItem::product_id).collect()
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), ReturnError> {
        if allowed {
            Ok(())
        } else {
            Err(ReturnError::InvalidStateTransition {
                current_state: self.status,
                action,
            })
        }
    }
}

fn total_of(items: &[ReturnItem]) -> Result<Money, MoneyError> {
    let currency = items
        .first()
        .map(|i| i.unit_price().currency())
        .unwrap_or_default();
    items
        .iter()
        .try_fold(Money::zero(currency), |acc, item| acc.add(&item.total_price()))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;

    use crate::aggregate::DomainEvent;
    use crate::returns::ProductCondition;

    use super::*;

    fn item(name: &str, quantity: u32, price: Decimal) -> ReturnItem {
        ReturnItem::new(ProductId::new(), name, quantity, Money::ron(price).unwrap()).unwrap()
    }

    fn request(items: Vec<ReturnItem>, policy: ReturnPolicy, delivered_days_ago: i64) -> ReturnRequest {
        ReturnRequest {
            order_id: AggregateId::new(),
            customer_id: CustomerId::new(),
            customer_name: "Ana Pop".to_string(),
            customer_email: "ana@example.ro".to_string(),
            delivery_date: Utc::now() - Duration::days(delivered_days_ago),
            items,
            reason: ReturnReason::ChangedMind,
            description: "Not what I expected".to_string(),
            policy,
        }
    }

    fn received(item: &ReturnItem, condition: ProductCondition) -> ReceivedItem {
        ReceivedItem {
            product_id: item.product_id(),
            quantity: item.quantity_requested(),
            condition,
            notes: String::new(),
            acceptable_for_resale: condition == ProductCondition::Intact,
        }
    }

    fn requested_return(price: Decimal) -> Return {
        Return::request(request(vec![item("Headphones", 1, price)], ReturnPolicy::standard(), 3))
            .unwrap()
    }

    #[test]
    fn test_request_totals_items_and_issues_rma() {
        let ret = Return::request(request(
            vec![item("Shirt", 2, dec!(59.90)), item("Belt", 1, dec!(35))],
            ReturnPolicy::standard(),
            2,
        ))
        .unwrap();

        assert_eq!(ret.status(), ReturnStatus::Requested);
        assert_eq!(ret.total_amount(), Money::ron(dec!(154.80)).unwrap());
        assert!(ret.refund_amount().is_zero());

        let rma = ret.rma_code().as_str();
        assert!(rma.starts_with("RMA-"));
        assert_eq!(rma.len(), "RMA-YYYYMMDD-XXXXXXXX".len());
        assert!(rma.ends_with(&ret.id().short_code()));

        assert_eq!(ret.pending_events().len(), 1);
        assert_eq!(ret.pending_events()[0].event_type(), "ReturnRequested");
    }

    #[test]
    fn test_request_after_window_fails() {
        let err = Return::request(request(
            vec![item("Shirt", 1, dec!(99))],
            ReturnPolicy::standard(),
            20,
        ))
        .unwrap_err();

        assert!(matches!(err, ReturnError::WindowExpired { .. }));
        assert!(err.to_string().starts_with("Return window has expired"));
    }

    #[test]
    fn test_non_returnable_policy_rejected_inside_window() {
        let req = request(vec![item("Cake", 1, dec!(80))], ReturnPolicy::non_returnable(), 0);
        let at = req.delivery_date;

        assert_eq!(Return::request_at(req, at).unwrap_err(), ReturnError::NotReturnable);
    }

    #[test]
    fn test_disallowed_reason_rejected() {
        let policy = ReturnPolicy::standard().with_allowed_reasons([ReturnReason::DefectiveProduct]);
        let err = Return::request(request(vec![item("Kettle", 1, dec!(120))], policy, 1)).unwrap_err();

        assert_eq!(
            err,
            ReturnError::ReasonNotAllowed {
                reason: ReturnReason::ChangedMind
            }
        );
    }

    #[test]
    fn test_empty_items_rejected() {
        let err = Return::request(request(vec![], ReturnPolicy::standard(), 1)).unwrap_err();
        assert_eq!(err, ReturnError::NoItems);
    }

    #[test]
    fn test_full_flow_without_fee_refunds_item_price() {
        let mut ret = requested_return(dec!(299.99));
        let line = ret.items()[0].clone();

        ret.approve(UserId::new(), "Maria", "ok", false).unwrap();
        assert_eq!(ret.refund_amount(), Money::ron(dec!(299.99)).unwrap());

        ret.receive_products(
            UserId::new(),
            "Ion",
            vec![received(&line, ProductCondition::Intact)],
            "AWB123",
            "WH-A1",
            "",
        )
        .unwrap();
        assert!(ret.all_items_received());

        ret.accept_and_process_refund(
            UserId::new(),
            "Maria",
            RefundMethod::OriginalPaymentMethod,
            "",
            "",
            true,
        )
        .unwrap();
        assert_eq!(ret.status(), ReturnStatus::Accepted);
        assert_eq!(ret.refund_amount(), Money::ron(dec!(299.99)).unwrap());

        ret.complete("RFD-0001").unwrap();
        assert_eq!(ret.status(), ReturnStatus::Completed);
        assert_eq!(ret.refund_reference(), Some("RFD-0001"));

        let types: Vec<_> = ret.pending_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            [
                "ReturnRequested",
                "ReturnApproved",
                "ReturnReceived",
                "ReturnAccepted",
                "ReturnCompleted"
            ]
        );
    }

    #[test]
    fn test_approve_applies_restocking_fee() {
        let policy = ReturnPolicy::new(30, dec!(10)).unwrap();
        let mut ret =
            Return::request(request(vec![item("Tablet", 1, dec!(500))], policy, 1)).unwrap();

        ret.approve(UserId::new(), "Maria", "", true).unwrap();

        assert_eq!(ret.restocking_fee(), Money::ron(dec!(50)).unwrap());
        assert_eq!(ret.refund_amount(), Money::ron(dec!(450)).unwrap());
    }

    #[test]
    fn test_fee_skipped_when_not_requested() {
        let policy = ReturnPolicy::new(30, dec!(10)).unwrap();
        let mut ret =
            Return::request(request(vec![item("Tablet", 1, dec!(500))], policy, 1)).unwrap();

        ret.approve(UserId::new(), "Maria", "", false).unwrap();

        assert!(ret.restocking_fee().is_zero());
        assert_eq!(ret.refund_amount(), ret.total_amount());
    }

    #[test]
    fn test_receiving_unknown_product_changes_nothing() {
        let mut ret = requested_return(dec!(100));
        ret.approve(UserId::new(), "Maria", "", false).unwrap();
        let line = ret.items()[0].clone();

        let stranger = ReceivedItem {
            product_id: ProductId::new(),
            ..received(&line, ProductCondition::Intact)
        };
        let err = ret
            .receive_products(
                UserId::new(),
                "Ion",
                vec![received(&line, ProductCondition::Intact), stranger],
                "AWB",
                "WH",
                "",
            )
            .unwrap_err();

        assert!(matches!(err, ReturnError::ItemNotInReturn { .. }));
        assert_eq!(ret.status(), ReturnStatus::Approved);
        assert!(!ret.items()[0].is_inspected());
    }

    #[test]
    fn test_accept_requires_every_item_inspected() {
        let mut ret = Return::request(request(
            vec![item("Shirt", 1, dec!(60)), item("Hat", 1, dec!(40))],
            ReturnPolicy::standard(),
            1,
        ))
        .unwrap();
        ret.approve(UserId::new(), "Maria", "", false).unwrap();
        let first = ret.items()[0].clone();
        ret.receive_products(
            UserId::new(),
            "Ion",
            vec![received(&first, ProductCondition::Opened)],
            "AWB",
            "WH",
            "",
        )
        .unwrap();
        assert!(!ret.all_items_received());

        let err = ret
            .accept_and_process_refund(UserId::new(), "Maria", RefundMethod::Cash, "", "", false)
            .unwrap_err();
        assert_eq!(err, ReturnError::ItemsNotInspected);
    }

    #[test]
    fn test_reject_only_from_requested_or_received() {
        let mut ret = requested_return(dec!(100));
        ret.approve(UserId::new(), "Maria", "", false).unwrap();

        let err = ret
            .reject(UserId::new(), "Maria", "Too late", "")
            .unwrap_err();
        assert!(matches!(err, ReturnError::InvalidStateTransition { .. }));

        let mut fresh = requested_return(dec!(100));
        assert!(matches!(
            fresh.reject(UserId::new(), "Maria", " ", ""),
            Err(ReturnError::Required(_))
        ));
        fresh.reject(UserId::new(), "Maria", "Item used", "Signs of wear").unwrap();
        assert_eq!(fresh.status(), ReturnStatus::Rejected);
        assert_eq!(fresh.rejection_reason(), Some("Item used"));
    }

    #[test]
    fn test_cancel_before_receipt_only() {
        let mut ret = requested_return(dec!(100));
        ret.approve(UserId::new(), "Maria", "", false).unwrap();
        ret.cancel("Customer kept the item").unwrap();
        assert_eq!(ret.status(), ReturnStatus::Cancelled);

        let mut received_return = requested_return(dec!(100));
        received_return.approve(UserId::new(), "Maria", "", false).unwrap();
        let line = received_return.items()[0].clone();
        received_return
            .receive_products(
                UserId::new(),
                "Ion",
                vec![received(&line, ProductCondition::Intact)],
                "AWB",
                "WH",
                "",
            )
            .unwrap();
        assert!(received_return.cancel("Changed mind").is_err());
    }

    #[test]
    fn test_complete_requires_acceptance() {
        let mut ret = requested_return(dec!(100));
        assert!(matches!(
            ret.complete("RFD-1"),
            Err(ReturnError::InvalidStateTransition { .. })
        ));
    }
}
