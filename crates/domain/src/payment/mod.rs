//! Payments, refunds and the services that reason across them.

mod events;
mod fraud;
mod ledger;
mod payment;
mod refund;
mod retry;
mod state;
mod value_objects;

pub use events::{
    PaymentCancelledData, PaymentCompletedData, PaymentCreatedData, PaymentEvent,
    PaymentFailedData, PaymentProcessingStartedData, PaymentRetryingData, RefundCancelledData,
    RefundCompletedData, RefundEvent, RefundFailedData, RefundInitiatedData,
    RefundProcessingStartedData, RefundRetryingData,
};
pub use fraud::{
    CRITICAL_AMOUNT_THRESHOLD, FraudCheckResult, FraudRiskLevel, LARGE_AMOUNT_THRESHOLD,
    RAPID_PAYMENT_LIMIT, RAPID_PAYMENT_WINDOW_MINUTES, assess_payment,
};
pub use ledger::{RefundLedger, has_completed_payment};
pub use payment::Payment;
pub use refund::Refund;
pub use retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, FailureOutcome, RetryPolicy};
pub use state::{PaymentStatus, RefundStatus};
pub use value_objects::{
    PaymentDetails, PaymentMethod, RefundReason, RefundReasonCategory, TransactionInfo,
};

use chrono::{DateTime, Utc};
use common::AggregateId;
use thiserror::Error;

use crate::error::{ErrorKind, InvariantViolation};
use crate::money::{Money, MoneyError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Payment amount must be greater than zero, got {amount}")]
    InvalidAmount { amount: Money },

    #[error("Payment details required for {method} payments")]
    CardDetailsRequired { method: PaymentMethod },

    #[error("Cannot {action} payment in status {current_state}")]
    InvalidPaymentTransition {
        current_state: PaymentStatus,
        action: &'static str,
    },

    #[error("Cannot {action} refund in status {current_state}")]
    InvalidRefundTransition {
        current_state: RefundStatus,
        action: &'static str,
    },

    #[error("Refund amount {requested} exceeds original payment amount {original}")]
    RefundExceedsPayment { requested: Money, original: Money },

    #[error("Refund of {requested} not allowed for payment {payment_id}; refundable balance is {remaining}")]
    NotRefundable {
        payment_id: AggregateId,
        requested: Money,
        remaining: Money,
    },

    #[error("ProcessedAt {processed_at} cannot be before creation at {created_at}")]
    ProcessedBeforeCreation {
        processed_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    },

    #[error("Order {order_id} already has a completed payment")]
    AlreadyPaid { order_id: AggregateId },

    #[error("Payment blocked by fraud check: {}", .reasons.join("; "))]
    FraudBlocked { reasons: Vec<String> },

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::Required(_)
            | PaymentError::InvalidAmount { .. }
            | PaymentError::CardDetailsRequired { .. }
            | PaymentError::ProcessedBeforeCreation { .. } => ErrorKind::InvalidCommand,
            PaymentError::InvalidPaymentTransition { .. }
            | PaymentError::InvalidRefundTransition { .. } => ErrorKind::InvalidOperation,
            PaymentError::RefundExceedsPayment { .. }
            | PaymentError::NotRefundable { .. }
            | PaymentError::AlreadyPaid { .. }
            | PaymentError::FraudBlocked { .. } => ErrorKind::BusinessRule,
            PaymentError::Money(e) => e.kind(),
            PaymentError::Invariant(_) => ErrorKind::InvariantViolation,
        }
    }
}
