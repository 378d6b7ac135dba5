//! Application error types.

use common::AggregateId;
use domain::returns::UserRole;
use domain::{
    DomainError, ErrorKind, InventoryError, OrderError, PaymentError, ReturnError, ShipmentError,
};
use store::StoreError;
use thiserror::Error;

use crate::collaborators::GatewayError;

/// Errors surfaced by application services.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain command or its persistence failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The order directory does not know the order.
    #[error("Order not found: {0}")]
    OrderNotFound(AggregateId),

    /// Returns can only be requested for delivered orders.
    #[error("Order {order_id} has not been delivered")]
    OrderNotDelivered { order_id: AggregateId },

    /// The acting user's role does not allow the operation.
    #[error("Not authorized: {reason}")]
    Unauthorized {
        reason: String,
        escalate_to: Option<UserRole>,
    },

    /// The payment gateway could not be reached.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApplicationError::Domain(e) => e.kind(),
            ApplicationError::OrderNotFound(_) => ErrorKind::NotFound,
            ApplicationError::OrderNotDelivered { .. } | ApplicationError::Unauthorized { .. } => {
                ErrorKind::BusinessRule
            }
            ApplicationError::Gateway(_) => ErrorKind::External,
        }
    }
}

macro_rules! from_domain_error {
    ($($error:ty),+ $(,)?) => {
        $(
            impl From<$error> for ApplicationError {
                fn from(err: $error) -> Self {
                    ApplicationError::Domain(DomainError::from(err))
                }
            }
        )+
    };
}

from_domain_error!(
    InventoryError,
    OrderError,
    PaymentError,
    ReturnError,
    ShipmentError,
    StoreError,
);

/// Result type for application services.
pub type Result<T> = std::result::Result<T, ApplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_errors_keep_their_kind() {
        let err: ApplicationError = InventoryError::InsufficientStock {
            sku: "SKU-1".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let err: ApplicationError = StoreError::NotFound {
            entity_type: "Order",
            aggregate_id: AggregateId::new(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn gateway_failures_are_external() {
        let err: ApplicationError = GatewayError::Unavailable("timeout".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::External);
        assert_eq!(err.to_string(), "Payment gateway unavailable: timeout");
    }

    #[test]
    fn unauthorized_is_a_business_rule() {
        let err = ApplicationError::Unauthorized {
            reason: "amount exceeds limit".to_string(),
            escalate_to: Some(UserRole::Manager),
        };
        assert_eq!(err.kind(), ErrorKind::BusinessRule);
    }
}
