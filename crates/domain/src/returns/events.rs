//! Return domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::ids::{CustomerId, ProductId, UserId};
use crate::money::Money;

use super::{ReturnItem, ReturnReason, RefundMethod, RmaCode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ReturnEvent {
    ReturnRequested(ReturnRequestedData),
    ReturnApproved(ReturnApprovedData),
    ReturnRejected(ReturnRejectedData),
    ReturnReceived(ReturnReceivedData),
    /// Inspection passed; carries the refund to pay out.
    ReturnAccepted(ReturnAcceptedData),
    ReturnCancelled(ReturnCancelledData),
    ReturnCompleted(ReturnCompletedData),
}

impl DomainEvent for ReturnEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReturnEvent::ReturnRequested(_) => "ReturnRequested",
            ReturnEvent::ReturnApproved(_) => "ReturnApproved",
            ReturnEvent::ReturnRejected(_) => "ReturnRejected",
            ReturnEvent::ReturnReceived(_) => "ReturnReceived",
            ReturnEvent::ReturnAccepted(_) => "ReturnAccepted",
            ReturnEvent::ReturnCancelled(_) => "ReturnCancelled",
            ReturnEvent::ReturnCompleted(_) => "ReturnCompleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRequestedData {
    pub return_id: AggregateId,
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub customer_email: String,
    pub items: Vec<ReturnItem>,
    pub reason: ReturnReason,
    pub description: String,
    pub total_amount: Money,
    pub rma_code: RmaCode,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnApprovedData {
    pub return_id: AggregateId,
    pub order_id: AggregateId,
    pub approved_by: UserId,
    pub approver_name: String,
    pub approved_amount: Money,
    pub restocking_fee: Money,
    pub restocking_fee_percent: Decimal,
    pub product_ids: Vec<ProductId>,
    pub rma_code: RmaCode,
    pub notes: String,
    pub approved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRejectedData {
    pub return_id: AggregateId,
    pub order_id: AggregateId,
    pub rejected_by: UserId,
    pub rejector_name: String,
    pub reason: String,
    pub explanation: String,
    pub customer_notified: bool,
    pub rejected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnReceivedData {
    pub return_id: AggregateId,
    pub order_id: AggregateId,
    pub received_by: UserId,
    pub receiver_name: String,
    pub items: Vec<ReturnItem>,
    pub tracking_number: String,
    pub warehouse_location: String,
    pub inspection_notes: String,
    pub all_items_received: bool,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnAcceptedData {
    pub return_id: AggregateId,
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub accepted_by: UserId,
    pub accepter_name: String,
    pub total_amount: Money,
    pub restocking_fee: Money,
    pub refund_amount: Money,
    pub refund_method: RefundMethod,
    pub refund_reference: String,
    pub product_ids: Vec<ProductId>,
    pub inventory_updated: bool,
    pub notes: String,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnCancelledData {
    pub return_id: AggregateId,
    pub order_id: AggregateId,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnCompletedData {
    pub return_id: AggregateId,
    pub order_id: AggregateId,
    pub refund_amount: Money,
    pub refund_method: RefundMethod,
    pub refund_reference: String,
    pub completed_at: DateTime<Utc>,
}
