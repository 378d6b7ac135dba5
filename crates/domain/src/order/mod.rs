//! Order aggregate and related types.

mod aggregate;
mod cancellation;
mod events;
mod state;
mod value_objects;

pub use aggregate::{MINIMUM_ORDER_AMOUNT, Order, TOTAL_TOLERANCE};
pub use cancellation::{CANCELLATION_FEE_PERCENT, cancellation_fee};
pub use events::{
    OrderCancellationRequestedData, OrderCancelledData, OrderConfirmedData, OrderEvent,
    OrderModificationRequestedData, OrderModifiedData, OrderPlacedData, OrderRejectedData,
    OrderValidatedData,
};
pub use state::OrderStatus;
pub use value_objects::{
    CancellationReason, OrderChange, OrderItem, OrderModification, PaymentMethod,
    RequestedChanges,
};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::{ErrorKind, InvariantViolation};
use crate::money::{Money, MoneyError};

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order must have at least one item")]
    NoItems,

    #[error("Product name is required")]
    EmptyProductName,

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Decimal },

    #[error("Order total must be at least {minimum}, got {total}")]
    BelowMinimumOrder { total: Money, minimum: Decimal },

    /// Order is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: OrderStatus,
        action: &'static str,
    },

    #[error("A reason is required to {action} an order")]
    ReasonRequired { action: &'static str },

    #[error("Modification description is required")]
    DescriptionRequired,

    #[error("Modification changes nothing")]
    EmptyModification,

    #[error("Paid amount {paid} is less than order total {total}")]
    InsufficientPayment { paid: Money, total: Money },

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NoItems
            | OrderError::EmptyProductName
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidPrice { .. }
            | OrderError::ReasonRequired { .. }
            | OrderError::DescriptionRequired
            | OrderError::EmptyModification => ErrorKind::InvalidCommand,
            OrderError::BelowMinimumOrder { .. } | OrderError::InsufficientPayment { .. } => {
                ErrorKind::BusinessRule
            }
            OrderError::InvalidStateTransition { .. } => ErrorKind::InvalidOperation,
            OrderError::Money(e) => e.kind(),
            OrderError::Invariant(_) => ErrorKind::InvariantViolation,
        }
    }
}
