//! Error taxonomy shared by every bounded context.

use serde::Serialize;
use store::StoreError;
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::order::OrderError;
use crate::payment::PaymentError;
use crate::returns::ReturnError;
use crate::shipping::ShipmentError;

/// Category of a failure, independent of which aggregate raised it.
///
/// Callers translate this into their own response shape (status code,
/// retry decision) without matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Malformed input: non-positive quantity, missing field, bad date.
    InvalidCommand,
    /// A referenced id does not exist.
    NotFound,
    /// Not enough available stock for a reservation.
    InsufficientStock,
    /// Input is well-formed but a business rule forbids it.
    BusinessRule,
    /// The command does not apply to the aggregate's current state.
    InvalidOperation,
    /// A post-condition failed. Indicates a bug, never a user error.
    InvariantViolation,
    /// The aggregate changed since it was loaded.
    ConcurrentModification,
    /// Storage or another collaborator failed.
    External,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidCommand => "invalid_command",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::BusinessRule => "business_rule",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::ConcurrentModification => "concurrent_modification",
            ErrorKind::External => "external",
        }
    }

    /// Only invariant violations are fatal; everything else is a normal
    /// rejection the caller can act on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::InvariantViolation)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post-condition that failed after a command ran.
///
/// The command's changes are discarded when this is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{aggregate_type} invariant violated: {message}")]
pub struct InvariantViolation {
    pub aggregate_type: &'static str,
    pub message: String,
}

impl InvariantViolation {
    pub fn new(aggregate_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            aggregate_type,
            message: message.into(),
        }
    }
}

/// Any failure surfaced by a domain operation or its persistence.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Return(#[from] ReturnError),

    #[error(transparent)]
    Shipment(#[from] ShipmentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Inventory(e) => e.kind(),
            DomainError::Order(e) => e.kind(),
            DomainError::Payment(e) => e.kind(),
            DomainError::Return(e) => e.kind(),
            DomainError::Shipment(e) => e.kind(),
            DomainError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            DomainError::Store(StoreError::ConcurrentModification { .. }) => {
                ErrorKind::ConcurrentModification
            }
            DomainError::Store(_) => ErrorKind::External,
        }
    }
}
