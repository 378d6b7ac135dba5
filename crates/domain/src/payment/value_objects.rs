//! Value objects for payments and refunds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PaymentError;

/// Instrument a payment is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    PayPal,
    BankTransfer,
    Cash,
}

impl PaymentMethod {
    /// Card payments must carry [`PaymentDetails`].
    pub fn requires_card_details(&self) -> bool {
        matches!(self, PaymentMethod::CreditCard | PaymentMethod::DebitCard)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CreditCard",
            PaymentMethod::DebitCard => "DebitCard",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::BankTransfer => "BankTransfer",
            PaymentMethod::Cash => "Cash",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn required(field: &'static str, value: impl Into<String>) -> Result<String, PaymentError> {
    let value = value.into();
    if value.trim().is_empty() {
        return Err(PaymentError::Required(field));
    }
    Ok(value)
}

/// Card data kept with a payment. Only the masked number is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    masked_card_number: String,
    card_holder_name: String,
    expiry_date: String,
}

impl PaymentDetails {
    pub fn new(
        masked_card_number: impl Into<String>,
        card_holder_name: impl Into<String>,
        expiry_date: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            masked_card_number: required("card number", masked_card_number)?,
            card_holder_name: required("card holder name", card_holder_name)?,
            expiry_date: expiry_date.into(),
        })
    }

    pub fn masked_card_number(&self) -> &str {
        &self.masked_card_number
    }

    pub fn card_holder_name(&self) -> &str {
        &self.card_holder_name
    }

    pub fn expiry_date(&self) -> &str {
        &self.expiry_date
    }
}

/// What the gateway returned for a successful charge or refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInfo {
    transaction_id: String,
    authorization_code: String,
    processed_at: DateTime<Utc>,
    gateway_response: String,
}

impl TransactionInfo {
    pub fn new(
        transaction_id: impl Into<String>,
        authorization_code: impl Into<String>,
        processed_at: DateTime<Utc>,
        gateway_response: impl Into<String>,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            transaction_id: required("transaction id", transaction_id)?,
            authorization_code: authorization_code.into(),
            processed_at,
            gateway_response: gateway_response.into(),
        })
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn authorization_code(&self) -> &str {
        &self.authorization_code
    }

    pub fn processed_at(&self) -> DateTime<Utc> {
        self.processed_at
    }

    pub fn gateway_response(&self) -> &str {
        &self.gateway_response
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefundReasonCategory {
    CustomerRequest,
    Fraud,
    Error,
    OrderCancellation,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReason {
    reason: String,
    category: RefundReasonCategory,
    requested_by: String,
    requested_at: DateTime<Utc>,
}

impl RefundReason {
    pub fn new(
        reason: impl Into<String>,
        category: RefundReasonCategory,
        requested_by: impl Into<String>,
        requested_at: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        Ok(Self {
            reason: required("refund reason", reason)?,
            category,
            requested_by: required("requested by", requested_by)?,
            requested_at,
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn category(&self) -> RefundReasonCategory {
        self.category
    }

    pub fn requested_by(&self) -> &str {
        &self.requested_by
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }
}
