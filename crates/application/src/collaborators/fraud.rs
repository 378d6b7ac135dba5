//! Fraud screening collaborator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use domain::Payment;
use domain::payment::{FraudCheckResult, RAPID_PAYMENT_WINDOW_MINUTES, assess_payment};

/// Scores a payment before it reaches the gateway.
#[async_trait]
pub trait FraudDetection: Send + Sync {
    async fn check_payment(&self, payment: &Payment, customer_email: &str) -> FraudCheckResult;
}

/// Applies the domain fraud rules, tracking recent payments per customer
/// email in memory.
///
/// Every screened payment counts towards the email's history, including the
/// ones that end up blocked.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFraudDetection {
    history: Arc<Mutex<HashMap<String, Vec<DateTime<Utc>>>>>,
}

impl InMemoryFraudDetection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screens a payment as if it arrived at `now`.
    pub fn check_payment_at(
        &self,
        payment: &Payment,
        customer_email: &str,
        now: DateTime<Utc>,
    ) -> FraudCheckResult {
        let key = customer_email.trim().to_lowercase();
        let window_start = now - Duration::minutes(RAPID_PAYMENT_WINDOW_MINUTES);

        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let seen = history.entry(key).or_default();
        seen.retain(|at| *at > window_start);
        let result = assess_payment(&payment.amount(), seen.len());
        seen.push(now);
        result
    }
}

#[async_trait]
impl FraudDetection for InMemoryFraudDetection {
    async fn check_payment(&self, payment: &Payment, customer_email: &str) -> FraudCheckResult {
        self.check_payment_at(payment, customer_email, Utc::now())
    }
}
