//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::contact::{CustomerInfo, ShippingAddress};
use crate::ids::{CustomerId, UserId};
use crate::money::Money;

use super::{OrderChange, OrderItem, OrderStatus, PaymentMethod, RequestedChanges};

/// Events that can occur on an order aggregate.
///
/// Payment, shipping and delivery progress is not recorded here; those facts
/// belong to the payment and shipment aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    OrderPlaced(OrderPlacedData),
    OrderValidated(OrderValidatedData),
    OrderRejected(OrderRejectedData),
    OrderConfirmed(OrderConfirmedData),
    /// The customer asked to cancel. The order is unchanged until cancelled.
    OrderCancellationRequested(OrderCancellationRequestedData),
    OrderCancelled(OrderCancelledData),
    OrderModificationRequested(OrderModificationRequestedData),
    OrderModified(OrderModifiedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderValidated(_) => "OrderValidated",
            OrderEvent::OrderRejected(_) => "OrderRejected",
            OrderEvent::OrderConfirmed(_) => "OrderConfirmed",
            OrderEvent::OrderCancellationRequested(_) => "OrderCancellationRequested",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
            OrderEvent::OrderModificationRequested(_) => "OrderModificationRequested",
            OrderEvent::OrderModified(_) => "OrderModified",
        }
    }
}

/// Full snapshot of a newly placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub customer_info: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub total_amount: Money,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderValidatedData {
    pub order_id: AggregateId,
    /// Actor that ran validation; `"System"` for automated checks.
    pub validated_by: String,
    pub validated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRejectedData {
    pub order_id: AggregateId,
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmedData {
    pub order_id: AggregateId,
    pub confirmed_by: UserId,
    pub estimated_delivery_date: DateTime<Utc>,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancellationRequestedData {
    pub order_id: AggregateId,
    pub requested_by: UserId,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelledData {
    pub order_id: AggregateId,
    pub cancelled_by: UserId,
    pub reason: String,
    /// Status the order held when it was cancelled.
    pub previous_status: OrderStatus,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderModificationRequestedData {
    pub order_id: AggregateId,
    pub requested_by: UserId,
    pub description: String,
    pub changes: RequestedChanges,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderModifiedData {
    pub order_id: AggregateId,
    pub changes: Vec<OrderChange>,
    pub previous_total: Money,
    pub new_total: Money,
    pub modified_at: DateTime<Utc>,
}
