//! Stock levels and reservations for a single SKU.

mod aggregate;
mod events;
mod reservation;

pub use aggregate::{DEFAULT_RESERVATION_TTL_HOURS, EXPIRED_RESERVATION_REASON, InventoryItem};
pub use events::{
    InventoryEvent, LowStockDetectedData, ReorderPointReachedData, StockAdjustedData,
    StockCommittedData, StockReleasedData, StockReservedData,
};
pub use reservation::{Reservation, ReservationId};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::{ErrorKind, InvariantViolation};

/// Errors raised by [`InventoryItem`] commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("SKU is required")]
    EmptySku,

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Reservation {reservation_id} already exists (idempotency check)")]
    DuplicateReservation { reservation_id: ReservationId },

    #[error("Insufficient stock for {sku}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        sku: String,
        available: u32,
        requested: u32,
    },

    #[error("Reservation expiry must be in the future, got {expires_at}")]
    ExpiryNotInFuture { expires_at: DateTime<Utc> },

    #[error("Reservation not found: {reservation_id}")]
    ReservationNotFound { reservation_id: ReservationId },

    #[error("Cannot release more than reserved. Reserved: {reserved}, Requested: {requested}")]
    ReleaseExceedsReserved { reserved: u32, requested: u32 },

    #[error("Cannot decrease stock below zero. On hand: {on_hand}, Requested: {requested}")]
    InsufficientOnHand { on_hand: u32, requested: u32 },

    #[error(
        "Cannot decrease reserved stock; commit the reservation instead. Unreserved: {available}, Requested: {requested}"
    )]
    WouldUndercutReservations { available: u32, requested: u32 },

    #[error("Stock level would overflow")]
    QuantityOverflow,

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::EmptySku
            | InventoryError::InvalidQuantity { .. }
            | InventoryError::ExpiryNotInFuture { .. }
            | InventoryError::ReleaseExceedsReserved { .. }
            | InventoryError::InsufficientOnHand { .. }
            | InventoryError::WouldUndercutReservations { .. }
            | InventoryError::QuantityOverflow => ErrorKind::InvalidCommand,
            InventoryError::DuplicateReservation { .. } => ErrorKind::BusinessRule,
            InventoryError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            InventoryError::ReservationNotFound { .. } => ErrorKind::NotFound,
            InventoryError::Invariant(_) => ErrorKind::InvariantViolation,
        }
    }
}
