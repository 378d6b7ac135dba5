//! Payment and refund status machines.

use serde::{Deserialize, Serialize};

/// ```text
/// Pending ──► Processing ──► Completed
///    ▲  │          │
///    │  │          ├──► Pending (retry)
///    │  │          └──► Failed
///    │  └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn can_start_processing(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    pub fn can_complete(&self) -> bool {
        matches!(self, PaymentStatus::Processing)
    }

    pub fn can_fail(&self) -> bool {
        matches!(self, PaymentStatus::Processing)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, PaymentStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Processing => "Processing",
            PaymentStatus::Completed => "Completed",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Same shape as [`PaymentStatus`], starting from `Initiated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RefundStatus {
    #[default]
    Initiated,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RefundStatus {
    pub fn can_start_processing(&self) -> bool {
        matches!(self, RefundStatus::Initiated)
    }

    pub fn can_complete(&self) -> bool {
        matches!(self, RefundStatus::Processing)
    }

    pub fn can_fail(&self) -> bool {
        matches!(self, RefundStatus::Processing)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, RefundStatus::Initiated)
    }

    /// Refunds in these states count against the payment's refundable
    /// balance.
    pub fn holds_funds(&self) -> bool {
        matches!(self, RefundStatus::Processing | RefundStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RefundStatus::Completed | RefundStatus::Failed | RefundStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Initiated => "Initiated",
            RefundStatus::Processing => "Processing",
            RefundStatus::Completed => "Completed",
            RefundStatus::Failed => "Failed",
            RefundStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
