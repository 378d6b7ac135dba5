//! Refund aggregate.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};
use store::{Entity, Version};

use crate::aggregate::{Aggregate, PendingEvents, transact};
use crate::error::InvariantViolation;
use crate::money::Money;

use super::retry::retry_at;
use super::{
    FailureOutcome, PaymentError, RefundCancelledData, RefundCompletedData, RefundEvent,
    RefundFailedData, RefundInitiatedData, RefundProcessingStartedData, RefundReason,
    RefundRetryingData, RefundStatus, RetryPolicy, TransactionInfo,
};

/// Money going back to the customer against a completed payment.
///
/// A refund only checks itself against the original payment amount. The
/// balance across every refund of a payment is enforced by
/// [`RefundLedger`](super::RefundLedger).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    id: AggregateId,

    #[serde(default)]
    version: Version,

    payment_id: AggregateId,
    order_id: AggregateId,
    refund_amount: Money,
    original_payment_amount: Money,
    status: RefundStatus,
    reason: RefundReason,
    transaction_info: Option<TransactionInfo>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    retry_count: u32,
    failure_reason: Option<String>,

    #[serde(skip)]
    pending: PendingEvents<RefundEvent>,
}

impl Entity for Refund {
    fn entity_type() -> &'static str {
        "Refund"
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

impl Aggregate for Refund {
    type Event = RefundEvent;
    type Error = PaymentError;

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |message: String| InvariantViolation::new(Self::entity_type(), message);

        if !self.refund_amount.is_positive() {
            return Err(violation("refund amount must be positive".to_string()));
        }
        let exceeds = self
            .refund_amount
            .try_cmp(&self.original_payment_amount)
            .map_err(|e| violation(e.to_string()))?
            .is_gt();
        if exceeds {
            return Err(violation(format!(
                "refund {} exceeds payment {}",
                self.refund_amount, self.original_payment_amount
            )));
        }
        if let Some(info) = &self.transaction_info {
            if info.processed_at() < self.created_at {
                return Err(violation("processed before creation".to_string()));
            }
        }
        if (self.status == RefundStatus::Completed) != self.transaction_info.is_some() {
            return Err(violation(
                "transaction info must be present exactly when completed".to_string(),
            ));
        }
        Ok(())
    }

    fn pending(&self) -> &PendingEvents<RefundEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<RefundEvent> {
        &mut self.pending
    }
}

impl Refund {
    pub fn payment_id(&self) -> AggregateId {
        self.payment_id
    }

    pub fn order_id(&self) -> AggregateId {
        self.order_id
    }

    pub fn refund_amount(&self) -> Money {
        self.refund_amount
    }

    pub fn original_payment_amount(&self) -> Money {
        self.original_payment_amount
    }

    pub fn status(&self) -> RefundStatus {
        self.status
    }

    pub fn reason(&self) -> &RefundReason {
        &self.reason
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

    pub fn initiate(
        payment_id: AggregateId,
        order_id: AggregateId,
        refund_amount: Money,
        original_payment_amount: Money,
        reason: RefundReason,
    ) -> Result<Self, PaymentError> {
        if !refund_amount.is_positive() {
            return Err(PaymentError::InvalidAmount {
                amount: refund_amount,
            });
        }
        if refund_amount.try_cmp(&original_payment_amount)?.is_gt() {
            return Err(PaymentError::RefundExceedsPayment {
                requested: refund_amount,
                original: original_payment_amount,
            });
        }

        let now = Utc::now();
        let mut refund = Self {
            id: AggregateId::new(),
            version: Version::initial(),
            payment_id,
            order_id,
            refund_amount,
            original_payment_amount,
            status: RefundStatus::Initiated,
            reason,
            transaction_info: None,
            created_at: now,
            processed_at: None,
            retry_count: 0,
            failure_reason: None,
            pending: PendingEvents::default(),
        };
        refund.check_invariants()?;

        let initiated = RefundEvent::RefundInitiated(RefundInitiatedData {
            refund_id: refund.id,
            payment_id,
            order_id,
            refund_amount,
            reason: refund.reason.reason().to_string(),
            category: refund.reason.category(),
            initiated_at: now,
        });
        refund.pending.extend([initiated]);
        Ok(refund)
    }

    pub fn start_processing(&mut self) -> Result<Vec<RefundEvent>, PaymentError> {
        self.ensure(self.status.can_start_processing(), "start processing")?;

        let now = Utc::now();
        transact(self, |refund| {
            refund.status = RefundStatus::Processing;
            Ok(vec![RefundEvent::RefundProcessingStarted(
                RefundProcessingStartedData {
                    refund_id: refund.id,
                    payment_id: refund.payment_id,
                    order_id: refund.order_id,
                    started_at: now,
                },
            )])
        })
    }

    pub fn complete(
        &mut self,
        transaction_info: TransactionInfo,
    ) -> Result<Vec<RefundEvent>, PaymentError> {
        self.ensure(self.status.can_complete(), "complete")?;
        if transaction_info.processed_at() < self.created_at {
            return Err(PaymentError::ProcessedBeforeCreation {
                processed_at: transaction_info.processed_at(),
                created_at: self.created_at,
            });
        }

        let now = Utc::now();
        transact(self, |refund| {
            let transaction_id = transaction_info.transaction_id().to_string();
            refund.status = RefundStatus::Completed;
            refund.transaction_info = Some(transaction_info);
            refund.processed_at = Some(now);
            Ok(vec![RefundEvent::RefundCompleted(RefundCompletedData {
                refund_id: refund.id,
                payment_id: refund.payment_id,
                order_id: refund.order_id,
                refund_amount: refund.refund_amount,
                transaction_id,
                completed_at: now,
            })])
        })
    }

    /// Same contract as [`Payment::fail`](super::Payment::fail); a retried
    /// refund returns to `Initiated`.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        policy: &RetryPolicy,
    ) -> Result<FailureOutcome, PaymentError> {
        self.ensure(self.status.can_fail(), "fail")?;

        let reason = reason.into();
        let outcome = policy.decide(self.retry_count);
        let now = Utc::now();
        transact(self, |refund| {
            let event = match outcome {
                FailureOutcome::Retrying {
                    attempt,
                    retry_after,
                } => {
                    refund.retry_count = attempt;
                    refund.status = RefundStatus::Initiated;
                    refund.failure_reason = Some(reason.clone());
                    RefundEvent::RefundRetrying(RefundRetryingData {
                        refund_id: refund.id,
                        payment_id: refund.payment_id,
                        order_id: refund.order_id,
                        retry_count: attempt,
                        failure_reason: reason,
                        retry_at: retry_at(now, retry_after),
                    })
                }
                FailureOutcome::Exhausted => {
                    let failure_reason = format!("Max retries exceeded. Last error: {reason}");
                    refund.status = RefundStatus::Failed;
                    refund.failure_reason = Some(failure_reason.clone());
                    refund.processed_at = Some(now);
                    RefundEvent::RefundFailed(RefundFailedData {
                        refund_id: refund.id,
                        payment_id: refund.payment_id,
                        order_id: refund.order_id,
                        failure_reason,
                        failed_at: now,
                    })
                }
            };
            Ok(vec![event])
        })?;
        Ok(outcome)
    }

    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<Vec<RefundEvent>, PaymentError> {
        self.ensure(self.status.can_cancel(), "cancel")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(PaymentError::Required("cancellation reason"));
        }

        let now = Utc::now();
        transact(self, |refund| {
            refund.status = RefundStatus::Cancelled;
            refund.failure_reason = Some(reason.clone());
            refund.processed_at = Some(now);
            Ok(vec![RefundEvent::RefundCancelled(RefundCancelledData {
                refund_id: refund.id,
                payment_id: refund.payment_id,
                order_id: refund.order_id,
                reason,
                cancelled_at: now,
            })])
        })
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), PaymentError> {
        if allowed {
            Ok(())
        } else {
            Err(PaymentError::InvalidRefundTransition {
                current_state: self.status,
                action,
            })
        }
    }
}
