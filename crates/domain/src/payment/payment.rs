//! Payment aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};
use store::{Entity, Version};

use crate::aggregate::{Aggregate, PendingEvents, transact};
use crate::error::InvariantViolation;
use crate::money::Money;

use super::retry::retry_at;
use super::{
    FailureOutcome, PaymentCancelledData, PaymentCompletedData, PaymentCreatedData,
    PaymentDetails, PaymentError, PaymentEvent, PaymentFailedData, PaymentMethod,
    PaymentProcessingStartedData, PaymentRetryingData, PaymentStatus, RetryPolicy,
    TransactionInfo,
};

/// A charge against the customer for one order.
///
/// The aggregate does not know about other payments; keeping a single
/// completed payment per order is the caller's job (see
/// [`has_completed_payment`](super::has_completed_payment)).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    id: AggregateId,

    #[serde(default)]
    version: Version,

    order_id: AggregateId,
    amount: Money,
    status: PaymentStatus,
    payment_method: PaymentMethod,
    payment_details: Option<PaymentDetails>,
    transaction_info: Option<TransactionInfo>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    retry_count: u32,
    failure_reason: Option<String>,

    #[serde(skip)]
    pending: PendingEvents<PaymentEvent>,
}

impl Entity for Payment {
    fn entity_type() -> &'static str {
        "Payment"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}

impl Aggregate for Payment {
    type Event = PaymentEvent;
    type Error = PaymentError;

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |message: &str| InvariantViolation::new(Self::entity_type(), message);

        if !self.amount.is_positive() {
            return Err(violation("amount must be positive"));
        }
        if self.payment_method.requires_card_details() && self.payment_details.is_none() {
            return Err(violation("card payment without card details"));
        }
        if (self.status == PaymentStatus::Completed) != self.transaction_info.is_some() {
            return Err(violation(
                "transaction info must be present exactly when completed",
            ));
        }
        Ok(())
    }

    fn pending(&self) -> &PendingEvents<PaymentEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<PaymentEvent> {
        &mut self.pending
    }
}

impl Payment {
    pub fn order_id(&self) -> AggregateId {
        self.order_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_details(&self) -> Option<&PaymentDetails> {
        self.payment_details.as_ref()
    }

    pub fn transaction_info(&self) -> Option<&TransactionInfo> {
        self.transaction_info.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn can_be_refunded(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    pub fn create(
        order_id: AggregateId,
        amount: Money,
        payment_method: PaymentMethod,
        payment_details: Option<PaymentDetails>,
    ) -> Result<Self, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount { amount });
        }
        if payment_method.requires_card_details() && payment_details.is_none() {
            return Err(PaymentError::CardDetailsRequired {
                method: payment_method,
            });
        }

        let now = Utc::now();
        let mut payment = Self {
            id: AggregateId::new(),
            version: Version::initial(),
            order_id,
            amount,
            status: PaymentStatus::Pending,
            payment_method,
            payment_details,
            transaction_info: None,
            created_at: now,
            processed_at: None,
            retry_count: 0,
            failure_reason: None,
            pending: PendingEvents::default(),
        };
        payment.check_invariants()?;

        let created = PaymentEvent::PaymentCreated(PaymentCreatedData {
            payment_id: payment.id,
            order_id,
            amount,
            payment_method,
            created_at: now,
        });
        payment.pending.extend([created]);
        Ok(payment)
    }

    pub fn start_processing(&mut self) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.ensure(self.status.can_start_processing(), "start processing")?;

        let now = Utc::now();
        transact(self, |payment| {
            payment.status = PaymentStatus::Processing;
            Ok(vec![PaymentEvent::PaymentProcessingStarted(
                PaymentProcessingStartedData {
                    payment_id: payment.id,
                    order_id: payment.order_id,
                    started_at: now,
                },
            )])
        })
    }

    /// Records the gateway's confirmation. A payment completes at most once.
    pub fn complete(
        &mut self,
        transaction_info: TransactionInfo,
    ) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.ensure(self.status.can_complete(), "complete")?;

        let now = Utc::now();
        transact(self, |payment| {
            let transaction_id = transaction_info.transaction_id().to_string();
            payment.status = PaymentStatus::Completed;
            payment.transaction_info = Some(transaction_info);
            payment.processed_at = Some(now);
            Ok(vec![PaymentEvent::PaymentCompleted(PaymentCompletedData {
                payment_id: payment.id,
                order_id: payment.order_id,
                amount: payment.amount,
                transaction_id,
                completed_at: now,
            })])
        })
    }

    /// Records a gateway failure.
    ///
    /// `policy` decides whether the payment goes back to `Pending` for
    /// another attempt or becomes terminally `Failed`. Re-processing a
    /// retried payment is up to the caller.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        policy: &RetryPolicy,
    ) -> Result<FailureOutcome, PaymentError> {
        self.ensure(self.status.can_fail(), "fail")?;

        let reason = reason.into();
        let outcome = policy.decide(self.retry_count);
        let now = Utc::now();
        transact(self, |payment| {
            let event = match outcome {
                FailureOutcome::Retrying {
                    attempt,
                    retry_after,
                } => {
                    payment.retry_count = attempt;
                    payment.status = PaymentStatus::Pending;
                    payment.failure_reason = Some(reason.clone());
                    PaymentEvent::PaymentRetrying(PaymentRetryingData {
                        payment_id: payment.id,
                        order_id: payment.order_id,
                        retry_count: attempt,
                        failure_reason: reason,
                        retry_at: retry_at(now, retry_after),
                    })
                }
                FailureOutcome::Exhausted => {
                    let failure_reason = format!("Max retries exceeded. Last error: {reason}");
                    payment.status = PaymentStatus::Failed;
                    payment.failure_reason = Some(failure_reason.clone());
                    payment.processed_at = Some(now);
                    PaymentEvent::PaymentFailed(PaymentFailedData {
                        payment_id: payment.id,
                        order_id: payment.order_id,
                        failure_reason,
                        failed_at: now,
                    })
                }
            };
            Ok(vec![event])
        })?;
        Ok(outcome)
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<Vec<PaymentEvent>, PaymentError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(PaymentError::Required("cancellation reason"));
        }

        let now = Utc::now();
        transact(self, |payment| {
            payment.status = PaymentStatus::Cancelled;
            payment.failure_reason = Some(reason.clone());
            payment.processed_at = Some(now);
            Ok(vec![PaymentEvent::PaymentCancelled(PaymentCancelledData {
                payment_id: payment.id,
                order_id: payment.order_id,
                reason,
                cancelled_at: now,
            })])
        })
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), PaymentError> {
        if allowed {
            Ok(())
        } else {
            Err(PaymentError::InvalidPaymentTransition {
                current_state: self.status,
                action,
            })
        }
    }
}
