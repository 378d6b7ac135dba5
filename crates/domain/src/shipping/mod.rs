//! Shipping and delivery of orders.

mod aggregate;
mod events;
mod state;

pub use aggregate::{DEFAULT_DELIVERY_DAYS, Shipment, TrackingEvent};
pub use events::{
    DeliveryAddressUpdatedData, OrderDeliveredData, OrderShippedData, ShipmentCreatedData,
    ShipmentDelayedData, ShipmentEvent, ShipmentLostData, ShipmentPreparedData,
    ShipmentReturnedData, ShipmentTrackingUpdatedData,
};
pub use state::ShipmentStatus;

use chrono::{DateTime, Utc};
use common::AggregateId;
use thiserror::Error;

use crate::contact::ValidationError;
use crate::error::{ErrorKind, InvariantViolation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShipmentError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Estimated delivery date must be in the future, got {estimate}")]
    EstimateNotInFuture { estimate: DateTime<Utc> },

    #[error("New delivery estimate {proposed} must be later than current estimate {current}")]
    DelayNotLater {
        current: DateTime<Utc>,
        proposed: DateTime<Utc>,
    },

    #[error("Cannot {action} shipment in status {current_state}")]
    InvalidStateTransition {
        current_state: ShipmentStatus,
        action: &'static str,
    },

    #[error("Shipment for order {order_id} already exists")]
    AlreadyExists { order_id: AggregateId },

    #[error(transparent)]
    Address(#[from] ValidationError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl ShipmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShipmentError::Required(_)
            | ShipmentError::EstimateNotInFuture { .. }
            | ShipmentError::DelayNotLater { .. } => ErrorKind::InvalidCommand,
            ShipmentError::InvalidStateTransition { .. } => ErrorKind::InvalidOperation,
            ShipmentError::AlreadyExists { .. } => ErrorKind::BusinessRule,
            ShipmentError::Address(e) => e.kind(),
            ShipmentError::Invariant(_) => ErrorKind::InvariantViolation,
        }
    }
}
