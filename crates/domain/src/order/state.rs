//! Order status machine.

use serde::{Deserialize, Serialize};

/// Where an order is in its lifecycle.
///
/// ```text
/// Placed ──► Validated ──► Confirmed ──► Paid ──► Shipped ──► Delivered
///   │            │             │           │
///   ├──► Rejected│             │           │
///   └────────────┴─────────────┴───────────┴──► Cancelled
/// ```
///
/// `Modified` is transient: a modification passes through it and lands back
/// on `Placed` within the same command, so a saved order never holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Placed,
    Validated,
    /// Failed validation (terminal).
    Rejected,
    Confirmed,
    Paid,
    Shipped,
    /// Terminal.
    Delivered,
    /// Terminal.
    Cancelled,
    Modified,
}

impl OrderStatus {
    pub fn can_validate(&self) -> bool {
        matches!(self, OrderStatus::Placed)
    }

    pub fn can_reject(&self) -> bool {
        matches!(self, OrderStatus::Placed)
    }

    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Validated)
    }

    /// Cancellation is possible until the order leaves the warehouse.
    pub fn can_cancel(&self) -> bool {
        !matches!(
            self,
            OrderStatus::Shipped
                | OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Rejected
        )
    }

    pub fn can_modify(&self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::Validated)
    }

    pub fn can_mark_paid(&self) -> bool {
        matches!(self, OrderStatus::Confirmed)
    }

    pub fn can_mark_shipped(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    pub fn can_mark_delivered(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Validated => "Validated",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Modified => "Modified",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
