//! Return status machine.

use serde::{Deserialize, Serialize};

/// ```text
/// Requested ──► Approved ──► Received ──► Accepted ──► Completed
///     │  │          │            │
///     │  └──────────┴──► Cancelled
///     └─────────────────────────┴──► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReturnStatus {
    #[default]
    Requested,
    Approved,
    Rejected,
    /// Goods arrived at the warehouse.
    Received,
    /// Inspection passed, refund is being paid.
    Accepted,
    Completed,
    /// Withdrawn by the customer.
    Cancelled,
}

impl ReturnStatus {
    pub fn can_approve(&self) -> bool {
        matches!(self, ReturnStatus::Requested)
    }

    pub fn can_receive(&self) -> bool {
        matches!(self, ReturnStatus::Approved)
    }

    pub fn can_accept(&self) -> bool {
        matches!(self, ReturnStatus::Received)
    }

    pub fn can_reject(&self) -> bool {
        matches!(self, ReturnStatus::Requested | ReturnStatus::Received)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, ReturnStatus::Requested | ReturnStatus::Approved)
    }

    pub fn can_complete(&self) -> bool {
        matches!(self, ReturnStatus::Accepted)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReturnStatus::Rejected | ReturnStatus::Completed | ReturnStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Requested => "Requested",
            ReturnStatus::Approved => "Approved",
            ReturnStatus::Rejected => "Rejected",
            ReturnStatus::Received => "Received",
            ReturnStatus::Accepted => "Accepted",
            ReturnStatus::Completed => "Completed",
            ReturnStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_from_requested_or_received_only() {
        assert!(ReturnStatus::Requested.can_reject());
        assert!(ReturnStatus::Received.can_reject());
        assert!(!ReturnStatus::Approved.can_reject());
        assert!(!ReturnStatus::Accepted.can_reject());
    }

    #[test]
    fn test_cancel_only_before_goods_arrive() {
        assert!(ReturnStatus::Requested.can_cancel());
        assert!(ReturnStatus::Approved.can_cancel());
        assert!(!ReturnStatus::Received.can_cancel());
        assert!(!ReturnStatus::Completed.can_cancel());
    }
}
