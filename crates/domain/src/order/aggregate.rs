//! Order aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use store::{Entity, Version};

use crate::aggregate::{Aggregate, PendingEvents, transact};
use crate::contact::{CustomerInfo, ShippingAddress};
use crate::error::InvariantViolation;
use crate::ids::{CustomerId, UserId};
use crate::money::{Money, MoneyError};

use super::{
    CancellationReason, OrderCancellationRequestedData, OrderCancelledData, OrderChange,
    OrderConfirmedData, OrderError, OrderEvent, OrderItem, OrderModificationRequestedData,
    OrderModification, OrderModifiedData, OrderPlacedData, OrderRejectedData, OrderStatus,
    OrderValidatedData, PaymentMethod, RequestedChanges,
};

/// Smallest order total accepted, in the order's own currency.
pub const MINIMUM_ORDER_AMOUNT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Allowed drift between the stored total and the sum of line totals.
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const SYSTEM_ACTOR: &str = "System";

/// A customer order.
///
/// Orders are created through [`Order::place`], which computes the total
/// and checks every invariant before the aggregate exists. The currency of
/// the first item is the currency of the whole order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: AggregateId,

    #[serde(default)]
    version: Version,

    customer_id: CustomerId,
    customer_info: CustomerInfo,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    total_amount: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    modified_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    confirmed_by: Option<UserId>,
    estimated_delivery_date: Option<DateTime<Utc>>,
    payment_id: Option<AggregateId>,
    awb_number: Option<String>,
    cancellation_reason: Option<CancellationReason>,
    rejection_reason: Option<String>,

    #[serde(skip)]
    pending: PendingEvents<OrderEvent>,
}

impl Entity for Order {
    fn entity_type() -> &'static str {
        "Order"
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

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |message: String| InvariantViolation::new(Self::entity_type(), message);

        if self.items.is_empty() {
            return Err(violation("order has no items".to_string()));
        }
        if self
            .items
            .iter()
            .any(|i| i.quantity() == 0 || !i.unit_price().is_positive())
        {
            return Err(violation("item with non-positive quantity or price".to_string()));
        }
        let computed = total_of(&self.items).map_err(|e| violation(e.to_string()))?;
        if computed.currency() != self.total_amount.currency()
            || (computed.amount() - self.total_amount.amount()).abs() > TOTAL_TOLERANCE
        {
            return Err(violation(format!(
                "total {} does not match line items {computed}",
                self.total_amount
            )));
        }
        if self.total_amount.amount() < MINIMUM_ORDER_AMOUNT {
            return Err(violation(format!(
                "total {} below minimum order amount",
                self.total_amount
            )));
        }
        if !self.shipping_address.is_valid() {
            return Err(violation("shipping address is invalid".to_string()));
        }
        if self.status == OrderStatus::Modified {
            return Err(violation("Modified status must not outlive a command".to_string()));
        }
        Ok(())
    }

    fn pending(&self) -> &PendingEvents<OrderEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<OrderEvent> {
        &mut self.pending
    }
}

// Queries
impl Order {
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn customer_info(&self) -> &CustomerInfo {
        &self.customer_info
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn confirmed_by(&self) -> Option<UserId> {
        self.confirmed_by
    }

    pub fn estimated_delivery_date(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery_date
    }

    /// Payment that settled the order, once paid.
    pub fn payment_id(&self) -> Option<AggregateId> {
        self.payment_id
    }

    pub fn awb_number(&self) -> Option<&str> {
        self.awb_number.as_deref()
    }

    pub fn cancellation_reason(&self) -> Option<&CancellationReason> {
        self.cancellation_reason.as_ref()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(OrderItem::quantity).sum()
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_cancel()
    }

    pub fn can_be_modified(&self) -> bool {
        self.status.can_modify()
    }
}

// Commands
impl Order {
    /// Places a new order. The returned aggregate holds an `OrderPlaced`
    /// event in its pending buffer.
    pub fn place(
        customer_id: CustomerId,
        customer_info: CustomerInfo,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Result<Self, OrderError> {
        let total_amount = checked_total(&items)?;
        let now = Utc::now();

        let mut order = Self {
            id: AggregateId::new(),
            version: Version::initial(),
            customer_id,
            customer_info,
            items,
            shipping_address,
            payment_method,
            total_amount,
            status: OrderStatus::Placed,
            created_at: now,
            modified_at: None,
            confirmed_at: None,
            confirmed_by: None,
            estimated_delivery_date: None,
            payment_id: None,
            awb_number: None,
            cancellation_reason: None,
            rejection_reason: None,
            pending: PendingEvents::default(),
        };
        order.check_invariants()?;

        let placed = OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: order.id,
            customer_id,
            customer_info: order.customer_info.clone(),
            items: order.items.clone(),
            shipping_address: order.shipping_address.clone(),
            payment_method,
            total_amount,
            placed_at: now,
        });
        order.pending.extend([placed]);
        Ok(order)
    }

    pub fn validate(&mut self) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_validate(), "validate")?;

        let now = Utc::now();
        transact(self, |order| {
            order.status = OrderStatus::Validated;
            order.modified_at = Some(now);
            Ok(vec![OrderEvent::OrderValidated(OrderValidatedData {
                order_id: order.id,
                validated_by: SYSTEM_ACTOR.to_string(),
                validated_at: now,
            })])
        })
    }

    pub fn reject(&mut self, reason: impl Into<String>) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_reject(), "reject")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(OrderError::ReasonRequired { action: "reject" });
        }

        let now = Utc::now();
        transact(self, |order| {
            order.status = OrderStatus::Rejected;
            order.rejection_reason = Some(reason.clone());
            order.modified_at = Some(now);
            Ok(vec![OrderEvent::OrderRejected(OrderRejectedData {
                order_id: order.id,
                reason,
                rejected_at: now,
            })])
        })
    }

    pub fn confirm(
        &mut self,
        confirmed_by: UserId,
        estimated_delivery_date: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_confirm(), "confirm")?;

        let now = Utc::now();
        transact(self, |order| {
            order.status = OrderStatus::Confirmed;
            order.confirmed_at = Some(now);
            order.confirmed_by = Some(confirmed_by);
            order.estimated_delivery_date = Some(estimated_delivery_date);
            order.modified_at = Some(now);
            Ok(vec![OrderEvent::OrderConfirmed(OrderConfirmedData {
                order_id: order.id,
                confirmed_by,
                estimated_delivery_date,
                confirmed_at: now,
            })])
        })
    }

    /// Records that a cancellation was asked for without cancelling.
    pub fn request_cancellation(
        &mut self,
        reason: impl Into<String>,
        requested_by: UserId,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        let reason = CancellationReason::new(reason, requested_by)?;

        transact(self, |order| {
            Ok(vec![OrderEvent::OrderCancellationRequested(
                OrderCancellationRequestedData {
                    order_id: order.id,
                    requested_by,
                    reason: reason.reason().to_string(),
                    requested_at: reason.requested_at(),
                },
            )])
        })
    }

    pub fn cancel(
        &mut self,
        reason: impl Into<String>,
        requested_by: UserId,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        let reason = CancellationReason::new(reason, requested_by)?;

        let now = Utc::now();
        transact(self, |order| {
            let previous_status = order.status;
            order.status = OrderStatus::Cancelled;
            order.modified_at = Some(now);
            let event = OrderEvent::OrderCancelled(OrderCancelledData {
                order_id: order.id,
                cancelled_by: requested_by,
                reason: reason.reason().to_string(),
                previous_status,
                cancelled_at: now,
            });
            order.cancellation_reason = Some(reason);
            Ok(vec![event])
        })
    }

    pub fn request_modification(
        &mut self,
        description: impl Into<String>,
        requested_by: UserId,
        changes: RequestedChanges,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_modify(), "modify")?;
        let description = description.into();
        if description.trim().is_empty() {
            return Err(OrderError::DescriptionRequired);
        }

        let now = Utc::now();
        transact(self, |order| {
            Ok(vec![OrderEvent::OrderModificationRequested(
                OrderModificationRequestedData {
                    order_id: order.id,
                    requested_by,
                    description,
                    changes,
                    requested_at: now,
                },
            )])
        })
    }

    /// Replaces items, address or payment method and sends the order back
    /// to `Placed` for re-validation.
    pub fn modify(
        &mut self,
        modification: OrderModification,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_modify(), "modify")?;
        if modification.is_empty() {
            return Err(OrderError::EmptyModification);
        }
        let new_total = match &modification.items {
            Some(items) => checked_total(items)?,
            None => self.total_amount,
        };

        let now = Utc::now();
        transact(self, |order| {
            let previous_total = order.total_amount;
            let mut changes = Vec::new();

            if let Some(items) = modification.items {
                let old = std::mem::replace(&mut order.items, items.clone());
                changes.push(OrderChange::Items { old, new: items });
                order.total_amount = new_total;
            }
            if let Some(address) = modification.shipping_address {
                let old = std::mem::replace(&mut order.shipping_address, address.clone());
                changes.push(OrderChange::ShippingAddress { old, new: address });
            }
            if let Some(method) = modification.payment_method {
                let old = std::mem::replace(&mut order.payment_method, method);
                changes.push(OrderChange::PaymentMethod { old, new: method });
            }

            order.status = OrderStatus::Modified;
            order.modified_at = Some(now);
            let event = OrderEvent::OrderModified(OrderModifiedData {
                order_id: order.id,
                changes,
                previous_total,
                new_total: order.total_amount,
                modified_at: now,
            });
            order.status = OrderStatus::Placed;
            Ok(vec![event])
        })
    }

    /// Settles a confirmed order. The payment event itself belongs to the
    /// payment aggregate, so nothing is emitted here.
    pub fn mark_as_paid(
        &mut self,
        payment_id: AggregateId,
        paid_amount: Money,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_mark_paid(), "mark as paid")?;
        if paid_amount.try_cmp(&self.total_amount)?.is_lt() {
            return Err(OrderError::InsufficientPayment {
                paid: paid_amount,
                total: self.total_amount,
            });
        }

        let now = Utc::now();
        transact(self, |order| {
            order.status = OrderStatus::Paid;
            order.payment_id = Some(payment_id);
            order.modified_at = Some(now);
            Ok(Vec::new())
        })
    }

    pub fn mark_as_shipped(
        &mut self,
        awb_number: impl Into<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_mark_shipped(), "mark as shipped")?;

        let awb_number = awb_number.into();
        let now = Utc::now();
        transact(self, |order| {
            order.status = OrderStatus::Shipped;
            order.awb_number = Some(awb_number).filter(|awb| !awb.trim().is_empty());
            order.modified_at = Some(now);
            Ok(Vec::new())
        })
    }

    pub fn mark_as_delivered(&mut self) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure(self.status.can_mark_delivered(), "mark as delivered")?;

        let now = Utc::now();
        transact(self, |order| {
            order.status = OrderStatus::Delivered;
            order.modified_at = Some(now);
            Ok(Vec::new())
        })
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), OrderError> {
        if allowed {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                current_state: self.status,
                action,
            })
        }
    }
}

fn total_of(items: &[OrderItem]) -> Result<Money, MoneyError> {
    let currency = items
        .first()
        .map(|i| i.unit_price().currency())
        .unwrap_or_default();
    items
        .iter()
        .try_fold(Money::zero(currency), |acc, item| acc.add(&item.line_total()))
}

/// Sums `items` and applies the rules a new item list must satisfy.
fn checked_total(items: &[OrderItem]) -> Result<Money, OrderError> {
    if items.is_empty() {
        return Err(OrderError::NoItems);
    }
    let total = total_of(items)?;
    if total.amount() < MINIMUM_ORDER_AMOUNT {
        return Err(OrderError::BelowMinimumOrder {
            total,
            minimum: MINIMUM_ORDER_AMOUNT,
        });
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::aggregate::DomainEvent;
    use crate::ids::ProductId;
    use crate::money::Currency;

    use super::*;

    fn item(name: &str, quantity: u32, price: Decimal) -> OrderItem {
        OrderItem::new(ProductId::new(), name, quantity, Money::ron(price).unwrap()).unwrap()
    }

    fn customer() -> CustomerInfo {
        CustomerInfo::new("Ana Pop", "ana@example.ro", "0712345678").unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress::new("Str. Lunga 1", "Cluj-Napoca", "Cluj", "400001").unwrap()
    }

    fn place(items: Vec<OrderItem>) -> Result<Order, OrderError> {
        Order::place(
            CustomerId::new(),
            customer(),
            items,
            address(),
            PaymentMethod::Card,
        )
    }

    fn placed_order() -> Order {
        place(vec![item("Keyboard", 2, dec!(49.99))]).unwrap()
    }

    fn confirmed_order() -> Order {
        let mut order = placed_order();
        order.validate().unwrap();
        order
            .confirm(UserId::new(), Utc::now() + chrono::Duration::days(3))
            .unwrap();
        order
    }

    #[test]
    fn test_place_computes_total_and_emits_placed() {
        let order = place(vec![
            item("Keyboard", 2, dec!(49.99)),
            item("Mouse", 1, dec!(25.50)),
        ])
        .unwrap();

        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.total_amount(), Money::ron(dec!(125.48)).unwrap());
        assert_eq!(order.total_quantity(), 3);
        assert_eq!(order.version(), Version::initial());

        let events = order.pending_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "OrderPlaced");
    }

    #[test]
    fn test_place_rejects_empty_and_small_orders() {
        assert_eq!(place(Vec::new()).unwrap_err(), OrderError::NoItems);

        let err = place(vec![item("Pen", 1, dec!(49.99))]).unwrap_err();
        assert!(matches!(err, OrderError::BelowMinimumOrder { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::BusinessRule);
    }

    #[test]
    fn test_place_rejects_mixed_currencies() {
        let eur = OrderItem::new(
            ProductId::new(),
            "Monitor",
            1,
            Money::new(dec!(200), Currency::Eur).unwrap(),
        )
        .unwrap();

        let err = place(vec![item("Keyboard", 2, dec!(49.99)), eur]).unwrap_err();

        assert!(matches!(
            err,
            OrderError::Money(MoneyError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut order = confirmed_order();
        let total = order.total_amount();
        let payment = AggregateId::new();

        assert!(order.mark_as_paid(payment, total).unwrap().is_empty());
        order.mark_as_shipped("AWB123").unwrap();
        order.mark_as_delivered().unwrap();

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.payment_id(), Some(payment));
        assert_eq!(order.awb_number(), Some("AWB123"));
        let types: Vec<_> = order.pending_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["OrderPlaced", "OrderValidated", "OrderConfirmed"]);
    }

    #[test]
    fn test_transitions_require_predecessor() {
        let mut order = placed_order();

        let err = order
            .confirm(UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::InvalidStateTransition {
                current_state: OrderStatus::Placed,
                action: "confirm"
            }
        );
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidOperation);
        assert!(order.mark_as_delivered().is_err());
        assert_eq!(order.status(), OrderStatus::Placed);
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut order = placed_order();
        assert_eq!(
            order.reject("  ").unwrap_err(),
            OrderError::ReasonRequired { action: "reject" }
        );

        order.reject("Out of delivery area").unwrap();
        assert_eq!(order.status(), OrderStatus::Rejected);
        assert_eq!(order.rejection_reason(), Some("Out of delivery area"));
        assert!(order.cancel("too late", UserId::new()).is_err());
    }

    #[test]
    fn test_mark_as_paid_rejects_short_payment() {
        let mut order = confirmed_order();

        let err = order
            .mark_as_paid(AggregateId::new(), Money::ron(dec!(10)).unwrap())
            .unwrap_err();

        assert!(matches!(err, OrderError::InsufficientPayment { .. }));
        assert_eq!(order.status(), OrderStatus::Confirmed);
    }

    #[test]
    fn test_cancel_records_previous_status() {
        let mut order = confirmed_order();
        let user = UserId::new();

        order.request_cancellation("changed plans", user).unwrap();
        assert_eq!(order.status(), OrderStatus::Confirmed);

        let events = order.cancel("changed plans", user).unwrap();
        match &events[0] {
            OrderEvent::OrderCancelled(data) => {
                assert_eq!(data.previous_status, OrderStatus::Confirmed);
                assert_eq!(data.cancelled_by, user);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(
            order.cancellation_reason().map(CancellationReason::reason),
            Some("changed plans")
        );
    }

    #[test]
    fn test_cannot_cancel_shipped_order() {
        let mut order = confirmed_order();
        let total = order.total_amount();
        order.mark_as_paid(AggregateId::new(), total).unwrap();
        order.mark_as_shipped("AWB1").unwrap();

        assert!(!order.can_be_cancelled());
        assert!(matches!(
            order.cancel("nope", UserId::new()),
            Err(OrderError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_modify_recomputes_total_and_returns_to_placed() {
        let mut order = placed_order();
        order.validate().unwrap();
        order.clear_pending_events();

        let events = order
            .modify(
                OrderModification::default()
                    .items(vec![item("Monitor", 1, dec!(899.00))])
                    .payment_method(PaymentMethod::BankTransfer),
            )
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.total_amount(), Money::ron(dec!(899.00)).unwrap());
        assert_eq!(order.payment_method(), PaymentMethod::BankTransfer);
        match &events[0] {
            OrderEvent::OrderModified(data) => {
                let fields: Vec<_> = data.changes.iter().map(OrderChange::field).collect();
                assert_eq!(fields, vec!["Items", "PaymentMethod"]);
                assert_eq!(data.previous_total, Money::ron(dec!(99.98)).unwrap());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(order.check_invariants().is_ok());
    }

    #[test]
    fn test_modify_below_minimum_leaves_order_untouched() {
        let mut order = placed_order();
        let before = order.total_amount();

        let err = order
            .modify(OrderModification::default().items(vec![item("Pen", 1, dec!(5))]))
            .unwrap_err();

        assert!(matches!(err, OrderError::BelowMinimumOrder { .. }));
        assert_eq!(order.total_amount(), before);
        assert_eq!(order.items().len(), 1);
    }

    #[test]
    fn test_modify_not_allowed_after_confirmation() {
        let mut order = confirmed_order();
        assert!(matches!(
            order.modify(OrderModification::default().payment_method(PaymentMethod::Cash)),
            Err(OrderError::InvalidStateTransition { .. })
        ));
        assert!(
            order
                .request_modification("swap colour", UserId::new(), RequestedChanges::new())
                .is_err()
        );
    }

    #[test]
    fn test_serialization_skips_pending_events() {
        let order = placed_order();
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("pending").is_none());

        let restored: Order = serde_json::from_value(json).unwrap();
        assert_eq!(restored.total_amount(), order.total_amount());
        assert!(restored.pending_events().is_empty());
    }
}
