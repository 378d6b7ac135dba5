//! Payment gateway trait and in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use domain::{Payment, Refund};
use serde::{Deserialize, Serialize};
use store::Entity;
use thiserror::Error;
use uuid::Uuid;

/// The gateway could not be reached or did not answer.
///
/// A declined charge is not an error; it comes back as a
/// [`GatewayResponse`] with `success == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a charge, refund or status lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub success: bool,
    pub transaction_id: Option<String>,
    pub authorization_code: Option<String>,
    pub error_message: Option<String>,
    pub gateway_response: String,
}

impl GatewayResponse {
    pub fn approved(
        transaction_id: impl Into<String>,
        authorization_code: impl Into<String>,
        gateway_response: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id.into()),
            authorization_code: Some(authorization_code.into()),
            error_message: None,
            gateway_response: gateway_response.into(),
        }
    }

    pub fn declined(error_message: impl Into<String>, gateway_response: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            authorization_code: None,
            error_message: Some(error_message.into()),
            gateway_response: gateway_response.into(),
        }
    }

    /// The reason to record when the response is a failure.
    pub fn failure_reason(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// External payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges the payment's amount.
    async fn process_payment(&self, payment: &Payment) -> Result<GatewayResponse, GatewayError>;

    /// Sends a refund back to the customer.
    async fn process_refund(&self, refund: &Refund) -> Result<GatewayResponse, GatewayError>;

    /// Looks up a transaction the gateway issued earlier.
    async fn check_transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<GatewayResponse, GatewayError>;
}

/// What the in-memory gateway does on its next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Approve,
    Decline(String),
    Unavailable(String),
}

#[derive(Debug, Default)]
struct GatewayState {
    script: VecDeque<ScriptedOutcome>,
    transactions: HashMap<String, bool>,
    calls: usize,
    next_auth: u32,
}

/// In-memory gateway for tests and local runs.
///
/// Approves every call unless outcomes were queued with
/// [`script`](Self::script); queued outcomes are consumed in order by
/// charges and refunds alike.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of a future call.
    pub fn script(&self, outcome: ScriptedOutcome) {
        self.state().script.push_back(outcome);
    }

    pub fn decline_next(&self, message: impl Into<String>) {
        self.script(ScriptedOutcome::Decline(message.into()));
    }

    pub fn fail_next(&self, message: impl Into<String>) {
        self.script(ScriptedOutcome::Unavailable(message.into()));
    }

    /// Number of charge and refund calls received.
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, prefix: &str, kind: &str) -> Result<GatewayResponse, GatewayError> {
        let mut state = self.state();
        state.calls += 1;
        match state.script.pop_front().unwrap_or(ScriptedOutcome::Approve) {
            ScriptedOutcome::Approve => {
                state.next_auth += 1;
                let transaction_id = format!("{prefix}-{}", short_id());
                let authorization_code = format!("AUTH-{:06}", state.next_auth);
                state.transactions.insert(transaction_id.clone(), true);
                Ok(GatewayResponse::approved(
                    transaction_id,
                    authorization_code,
                    format!("{kind} processed successfully"),
                ))
            }
            ScriptedOutcome::Decline(message) => Ok(GatewayResponse::declined(
                message,
                format!("{kind} declined"),
            )),
            ScriptedOutcome::Unavailable(message) => Err(GatewayError::Unavailable(message)),
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn process_payment(&self, payment: &Payment) -> Result<GatewayResponse, GatewayError> {
        tracing::debug!(payment_id = %payment.id(), amount = %payment.amount(), "gateway charge");
        self.respond("TXN", "Payment")
    }

    async fn process_refund(&self, refund: &Refund) -> Result<GatewayResponse, GatewayError> {
        tracing::debug!(refund_id = %refund.id(), amount = %refund.refund_amount(), "gateway refund");
        self.respond("RFD", "Refund")
    }

    async fn check_transaction_status(
        &self,
        transaction_id: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let state = self.state();
        if state.transactions.contains_key(transaction_id) {
            Ok(GatewayResponse {
                success: true,
                transaction_id: Some(transaction_id.to_string()),
                authorization_code: None,
                error_message: None,
                gateway_response: "Transaction status: Completed".to_string(),
            })
        } else {
            Ok(GatewayResponse::declined(
                format!("Unknown transaction {transaction_id}"),
                "Transaction status: Unknown",
            ))
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}
