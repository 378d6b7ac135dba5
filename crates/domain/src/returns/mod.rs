//! Product returns: the RMA lifecycle and the policies that govern it.

mod aggregate;
mod authorization;
mod eligibility;
mod events;
mod policy;
pub mod refund_calculation;
mod state;
mod value_objects;

pub use aggregate::{Return, ReturnRequest};
pub use authorization::{
    AuthorizationResult, CUSTOMER_SERVICE_LIMIT, MANAGER_LIMIT, SUPERVISOR_LIMIT, UserRole,
    can_approve_return, can_reject_return,
};
pub use eligibility::{
    EligibilityResult, EligibilityService, MINIMUM_RETURNABLE_AMOUNT, is_reason_valid,
};
pub use events::{
    ReturnAcceptedData, ReturnApprovedData, ReturnCancelledData, ReturnCompletedData,
    ReturnEvent, ReturnReceivedData, ReturnRejectedData, ReturnRequestedData,
};
pub use policy::{PolicyException, PolicyService};
pub use refund_calculation::{InspectedLine, RefundCalculation};
pub use state::ReturnStatus;
pub use value_objects::{
    ProductCondition, ReceivedItem, RefundMethod, ReturnItem, ReturnPolicy, ReturnReason,
    ReturnWindow, RmaCode,
};

use chrono::NaiveDate;
use common::AggregateId;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::{ErrorKind, InvariantViolation};
use crate::ids::ProductId;
use crate::money::MoneyError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Return must contain at least one item")]
    NoItems,

    #[error("Quantity must be greater than zero, got {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("Restocking fee must be between 0 and 100 percent, got {0}")]
    InvalidFeePercentage(Decimal),

    #[error("Return window has expired. Last day for return was {last_day}")]
    WindowExpired { last_day: NaiveDate },

    #[error("Products in this order are not returnable according to the policy")]
    NotReturnable,

    #[error("Return reason {reason} is not allowed by the policy")]
    ReasonNotAllowed { reason: ReturnReason },

    #[error("Cannot {action} return in status {current_state}")]
    InvalidStateTransition {
        current_state: ReturnStatus,
        action: &'static str,
    },

    #[error("Product {product_id} is not part of this return")]
    ItemNotInReturn { product_id: ProductId },

    #[error("Received quantity {received} exceeds requested {requested} for product {product_id}")]
    ReceivedExceedsRequested {
        product_id: ProductId,
        requested: u32,
        received: u32,
    },

    #[error("All items must be inspected before accepting the return")]
    ItemsNotInspected,

    #[error("An active return already exists for order {order_id}")]
    ActiveReturnExists { order_id: AggregateId },

    #[error("Not eligible for return: {reason}")]
    NotEligible { reason: String },

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl ReturnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReturnError::Required(_)
            | ReturnError::NoItems
            | ReturnError::InvalidQuantity { .. }
            | ReturnError::InvalidFeePercentage(_)
            | ReturnError::ItemNotInReturn { .. }
            | ReturnError::ReceivedExceedsRequested { .. } => ErrorKind::InvalidCommand,
            ReturnError::WindowExpired { .. }
            | ReturnError::NotReturnable
            | ReturnError::ReasonNotAllowed { .. }
            | ReturnError::ItemsNotInspected
            | ReturnError::ActiveReturnExists { .. }
            | ReturnError::NotEligible { .. } => ErrorKind::BusinessRule,
            ReturnError::InvalidStateTransition { .. } => ErrorKind::InvalidOperation,
            ReturnError::Money(e) => e.kind(),
            ReturnError::Invariant(_) => ErrorKind::InvariantViolation,
        }
    }
}
