//! Payment service: charges, retries and refunds through the gateway.

use std::sync::Arc;

use chrono::Utc;
use common::AggregateId;
use domain::payment::{
    FailureOutcome, PaymentStatus, RefundLedger, RefundReason, RetryPolicy, TransactionInfo,
    has_completed_payment,
};
use domain::{Money, Payment, PaymentError, Refund};
use store::Entity;

use crate::collaborators::{FraudDetection, GatewayResponse, PaymentGateway};
use crate::commands::{ProcessPayment, RefundPayment};
use crate::error::Result;
use crate::handler::CommandHandler;
use crate::repository::{OrderScopedRepository, find_refunds_by_payment_id};

/// Service for charging orders and refunding payments.
///
/// Each step of a charge is saved as it happens, so a crash between the
/// gateway call and the final save leaves the payment `Processing`.
pub struct PaymentService {
    payments: CommandHandler<Payment>,
    refunds: CommandHandler<Refund>,
    gateway: Arc<dyn PaymentGateway>,
    fraud: Arc<dyn FraudDetection>,
    retry_policy: RetryPolicy,
}

impl PaymentService {
    pub fn new(
        payments: CommandHandler<Payment>,
        refunds: CommandHandler<Refund>,
        gateway: Arc<dyn PaymentGateway>,
        fraud: Arc<dyn FraudDetection>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            payments,
            refunds,
            gateway,
            fraud,
            retry_policy,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub async fn get_payment(&self, payment_id: AggregateId) -> Result<Option<Payment>> {
        self.payments.get(payment_id).await
    }

    pub async fn get_refund(&self, refund_id: AggregateId) -> Result<Option<Refund>> {
        self.refunds.get(refund_id).await
    }

    pub async fn payments_for_order(&self, order_id: AggregateId) -> Result<Vec<Payment>> {
        Ok(self.payments.repository().find_by_order_id(order_id).await?)
    }

    pub async fn refunds_for_payment(&self, payment_id: AggregateId) -> Result<Vec<Refund>> {
        Ok(find_refunds_by_payment_id(self.refunds.repository(), payment_id).await?)
    }

    /// Charges an order.
    ///
    /// The returned payment is `Completed` on success, `Pending` when the
    /// gateway failed and a retry is allowed, or `Failed` once retries are
    /// used up. A payment blocked by fraud screening is saved as
    /// `Cancelled` and reported as [`PaymentError::FraudBlocked`].
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id))]
    pub async fn process_payment(&self, cmd: ProcessPayment) -> Result<Payment> {
        const COMMAND: &str = "process_payment";

        let existing = self.payments_for_order(cmd.order_id).await?;
        if has_completed_payment(&existing) {
            let err = PaymentError::AlreadyPaid {
                order_id: cmd.order_id,
            };
            return Err(self.payments.reject(COMMAND, err.into()));
        }

        let mut payment = Payment::create(
            cmd.order_id,
            cmd.amount,
            cmd.payment_method,
            cmd.payment_details,
        )
        .map_err(|e| self.payments.reject(COMMAND, e.into()))?;

        let screening = self.fraud.check_payment(&payment, &cmd.customer_email).await;
        if screening.is_suspicious() {
            tracing::warn!(
                payment_id = %payment.id(),
                risk = ?screening.risk_level,
                reasons = ?screening.reasons,
                "suspicious payment"
            );
        }
        if screening.should_block {
            payment.cancel(format!(
                "Blocked due to fraud detection: {}",
                screening.reasons.join(", ")
            ))?;
            self.payments.commit(COMMAND, &mut payment).await?;
            metrics::counter!("payments_processed_total", "outcome" => "blocked").increment(1);
            let err = PaymentError::FraudBlocked {
                reasons: screening.reasons,
            };
            return Err(self.payments.reject(COMMAND, err.into()));
        }

        payment.start_processing()?;
        self.payments.commit(COMMAND, &mut payment).await?;
        self.charge(&mut payment).await?;
        Ok(payment)
    }

    /// Sends a `Pending` payment that failed earlier back to the gateway.
    #[tracing::instrument(skip(self))]
    pub async fn retry_payment(&self, payment_id: AggregateId) -> Result<Payment> {
        let mut payment = self.payments.load(payment_id).await?;
        payment
            .start_processing()
            .map_err(|e| self.payments.reject("retry_payment", e.into()))?;
        self.payments.commit("retry_payment", &mut payment).await?;
        self.charge(&mut payment).await?;
        Ok(payment)
    }

    /// Asks the gateway whether the payment's transaction went through.
    /// Payments without a transaction report `false`.
    #[tracing::instrument(skip(self))]
    pub async fn verify_payment(&self, payment_id: AggregateId) -> Result<bool> {
        let payment = self.payments.load(payment_id).await?;
        let Some(info) = payment.transaction_info() else {
            return Ok(false);
        };
        let response = self
            .gateway
            .check_transaction_status(info.transaction_id())
            .await?;
        Ok(response.success)
    }

    /// Refunds part or all of a completed payment.
    ///
    /// The request must fit in what is left after the refunds that are
    /// processing or completed.
    #[tracing::instrument(skip(self), fields(payment_id = %cmd.payment_id))]
    pub async fn refund_payment(&self, cmd: RefundPayment) -> Result<Refund> {
        const COMMAND: &str = "refund_payment";

        let payment = self.payments.load(cmd.payment_id).await?;
        let refunds = self.refunds_for_payment(cmd.payment_id).await?;
        self.ensure_refundable(COMMAND, &payment, &refunds, cmd.amount)?;

        let reason = RefundReason::new(cmd.reason, cmd.category, cmd.requested_by, Utc::now())?;
        let mut refund = Refund::initiate(
            payment.id(),
            payment.order_id(),
            cmd.amount,
            payment.amount(),
            reason,
        )
        .map_err(|e| self.refunds.reject(COMMAND, e.into()))?;
        refund.start_processing()?;
        self.refunds.commit(COMMAND, &mut refund).await?;
        self.send_refund(&mut refund).await?;
        Ok(refund)
    }

    /// Sends an `Initiated` refund that failed earlier back to the gateway.
    ///
    /// Other refunds may have used up the balance since the first attempt,
    /// so the amount is checked again against them.
    #[tracing::instrument(skip(self))]
    pub async fn retry_refund(&self, refund_id: AggregateId) -> Result<Refund> {
        const COMMAND: &str = "retry_refund";

        let mut refund = self.refunds.load(refund_id).await?;
        let payment = self.payments.load(refund.payment_id()).await?;
        let others: Vec<Refund> = self
            .refunds_for_payment(payment.id())
            .await?
            .into_iter()
            .filter(|r| r.id() != refund_id)
            .collect();
        self.ensure_refundable(COMMAND, &payment, &others, refund.refund_amount())?;

        refund
            .start_processing()
            .map_err(|e| self.refunds.reject(COMMAND, e.into()))?;
        self.refunds.commit(COMMAND, &mut refund).await?;
        self.send_refund(&mut refund).await?;
        Ok(refund)
    }

    fn ensure_refundable(
        &self,
        command: &'static str,
        payment: &Payment,
        refunds: &[Refund],
        requested: Money,
    ) -> Result<()> {
        let ledger = RefundLedger::new(payment, refunds);
        if ledger.can_refund(&requested).map_err(PaymentError::from)? {
            return Ok(());
        }
        let err = PaymentError::NotRefundable {
            payment_id: payment.id(),
            requested,
            remaining: ledger.remaining().map_err(PaymentError::from)?,
        };
        Err(self.refunds.reject(command, err.into()))
    }

    async fn charge(&self, payment: &mut Payment) -> Result<()> {
        let outcome = match self.gateway.process_payment(payment).await {
            Ok(response) if response.success => {
                payment.complete(transaction_info(&response)?)?;
                "completed"
            }
            Ok(response) => {
                let outcome = payment.fail(response.failure_reason(), &self.retry_policy)?;
                outcome_label(outcome)
            }
            Err(e) => {
                tracing::warn!(payment_id = %payment.id(), error = %e, "gateway call failed");
                let outcome = payment.fail(e.to_string(), &self.retry_policy)?;
                outcome_label(outcome)
            }
        };
        self.payments.commit("charge", payment).await?;
        metrics::counter!("payments_processed_total", "outcome" => outcome).increment(1);

        if payment.status() == PaymentStatus::Pending {
            tracing::info!(
                payment_id = %payment.id(),
                retry_count = payment.retry_count(),
                reason = payment.failure_reason().unwrap_or_default(),
                "payment will be retried"
            );
        }
        Ok(())
    }

    async fn send_refund(&self, refund: &mut Refund) -> Result<()> {
        let outcome = match self.gateway.process_refund(refund).await {
            Ok(response) if response.success => {
                refund.complete(transaction_info(&response)?)?;
                "completed"
            }
            Ok(response) => {
                let outcome = refund.fail(response.failure_reason(), &self.retry_policy)?;
                outcome_label(outcome)
            }
            Err(e) => {
                tracing::warn!(refund_id = %refund.id(), error = %e, "gateway call failed");
                let outcome = refund.fail(e.to_string(), &self.retry_policy)?;
                outcome_label(outcome)
            }
        };
        self.refunds.commit("send_refund", refund).await?;
        metrics::counter!("refunds_processed_total", "outcome" => outcome).increment(1);
        Ok(())
    }
}

fn transaction_info(response: &GatewayResponse) -> std::result::Result<TransactionInfo, PaymentError> {
    TransactionInfo::new(
        response.transaction_id.clone().unwrap_or_default(),
        response.authorization_code.clone().unwrap_or_default(),
        Utc::now(),
        response.gateway_response.clone(),
    )
}

fn outcome_label(outcome: FailureOutcome) -> &'static str {
    match outcome {
        FailureOutcome::Retrying { .. } => "retrying",
        FailureOutcome::Exhausted => "failed",
    }
}
