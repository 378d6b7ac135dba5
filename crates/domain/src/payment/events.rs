//! Payment and refund domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::money::Money;

use super::{PaymentMethod, RefundReasonCategory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PaymentEvent {
    PaymentCreated(PaymentCreatedData),
    PaymentProcessingStarted(PaymentProcessingStartedData),
    PaymentCompleted(PaymentCompletedData),
    /// Retries exhausted; the payment is terminal.
    PaymentFailed(PaymentFailedData),
    /// A failure that sent the payment back to `Pending`.
    PaymentRetrying(PaymentRetryingData),
    PaymentCancelled(PaymentCancelledData),
}

impl DomainEvent for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentCreated(_) => "PaymentCreated",
            PaymentEvent::PaymentProcessingStarted(_) => "PaymentProcessingStarted",
            PaymentEvent::PaymentCompleted(_) => "PaymentCompleted",
            PaymentEvent::PaymentFailed(_) => "PaymentFailed",
            PaymentEvent::PaymentRetrying(_) => "PaymentRetrying",
            PaymentEvent::PaymentCancelled(_) => "PaymentCancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCreatedData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentProcessingStartedData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCompletedData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub amount: Money,
    pub transaction_id: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailedData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub failure_reason: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRetryingData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub retry_count: u32,
    pub failure_reason: String,
    /// Earliest time the caller should re-process.
    pub retry_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCancelledData {
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RefundEvent {
    RefundInitiated(RefundInitiatedData),
    RefundProcessingStarted(RefundProcessingStartedData),
    RefundCompleted(RefundCompletedData),
    RefundFailed(RefundFailedData),
    RefundRetrying(RefundRetryingData),
    RefundCancelled(RefundCancelledData),
}

impl DomainEvent for RefundEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RefundEvent::RefundInitiated(_) => "RefundInitiated",
            RefundEvent::RefundProcessingStarted(_) => "RefundProcessingStarted",
            RefundEvent::RefundCompleted(_) => "RefundCompleted",
            RefundEvent::RefundFailed(_) => "RefundFailed",
            RefundEvent::RefundRetrying(_) => "RefundRetrying",
            RefundEvent::RefundCancelled(_) => "RefundCancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundInitiatedData {
    pub refund_id: AggregateId,
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub refund_amount: Money,
    pub reason: String,
    pub category: RefundReasonCategory,
    pub initiated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundProcessingStartedData {
    pub refund_id: AggregateId,
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundCompletedData {
    pub refund_id: AggregateId,
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub refund_amount: Money,
    pub transaction_id: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundFailedData {
    pub refund_id: AggregateId,
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub failure_reason: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRetryingData {
    pub refund_id: AggregateId,
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub retry_count: u32,
    pub failure_reason: String,
    pub retry_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundCancelledData {
    pub refund_id: AggregateId,
    pub payment_id: AggregateId,
    pub order_id: AggregateId,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}
