//! Who may approve or reject a return.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

use super::ReturnReason;

pub const CUSTOMER_SERVICE_LIMIT: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);
pub const MANAGER_LIMIT: Decimal = Decimal::from_parts(5_000, 0, 0, false, 0);
pub const SUPERVISOR_LIMIT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Staff roles, ordered by authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserRole {
    CustomerService,
    Manager,
    Supervisor,
    Administrator,
}

impl UserRole {
    /// Largest return this role can approve alone. `None` means unlimited.
    pub fn approval_limit(&self) -> Option<Decimal> {
        match self {
            UserRole::CustomerService => Some(CUSTOMER_SERVICE_LIMIT),
            UserRole::Manager => Some(MANAGER_LIMIT),
            UserRole::Supervisor => Some(SUPERVISOR_LIMIT),
            UserRole::Administrator => None,
        }
    }

    fn escalates_to(&self) -> Option<UserRole> {
        match self {
            UserRole::CustomerService => Some(UserRole::Manager),
            UserRole::Manager => Some(UserRole::Supervisor),
            UserRole::Supervisor => Some(UserRole::Administrator),
            UserRole::Administrator => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::CustomerService => "CustomerService",
            UserRole::Manager => "Manager",
            UserRole::Supervisor => "Supervisor",
            UserRole::Administrator => "Administrator",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub is_authorized: bool,
    pub reason: String,
    pub requires_escalation: bool,
    pub escalation_level: Option<UserRole>,
}

impl AuthorizationResult {
    fn granted(reason: impl Into<String>) -> Self {
        Self {
            is_authorized: true,
            reason: reason.into(),
            requires_escalation: false,
            escalation_level: None,
        }
    }
}

/// Whether `role` may approve a return of `amount`.
///
/// Defects and transit damage are approvable by anyone. Otherwise each role
/// has a ceiling and anything above it escalates one level up.
pub fn can_approve_return(role: UserRole, amount: &Money, reason: ReturnReason) -> AuthorizationResult {
    if role == UserRole::Administrator {
        return AuthorizationResult::granted("Administrators can approve any return");
    }
    if matches!(
        reason,
        ReturnReason::DefectiveProduct | ReturnReason::DamagedInTransit
    ) {
        return AuthorizationResult::granted(format!("Returns for {reason} are always approvable"));
    }

    match role.approval_limit() {
        Some(limit) if amount.amount() > limit => AuthorizationResult {
            is_authorized: false,
            reason: format!("{role} can approve returns up to {limit} {}", amount.currency()),
            requires_escalation: true,
            escalation_level: role.escalates_to(),
        },
        _ => AuthorizationResult::granted(format!("Within {role} approval limit")),
    }
}

/// Rejecting a return needs at least a manager.
pub fn can_reject_return(role: UserRole) -> bool {
    role >= UserRole::Manager
}
