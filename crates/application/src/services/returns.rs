//! Returns service: requests, authorization checks and refund figures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::returns::{
    EligibilityResult, EligibilityService, InspectedLine, PolicyService, ReceivedItem,
    RefundCalculation, RefundMethod, ReturnRequest, UserRole, can_approve_return,
    can_reject_return, refund_calculation,
};
use domain::{Money, OrderStatus, Return, ReturnError, UserId};

use crate::collaborators::{OrderDirectory, OrderSummary};
use crate::commands::RequestReturn;
use crate::error::{ApplicationError, Result};
use crate::handler::{CommandHandler, CommandResult};
use crate::repository::OrderScopedRepository;

/// Service for the return lifecycle.
///
/// Approvals and rejections are checked against the acting user's role
/// before the aggregate is touched.
pub struct ReturnService {
    handler: CommandHandler<Return>,
    orders: Arc<dyn OrderDirectory>,
    eligibility: EligibilityService,
}

impl ReturnService {
    pub fn new(
        handler: CommandHandler<Return>,
        orders: Arc<dyn OrderDirectory>,
        policies: PolicyService,
    ) -> Self {
        Self {
            handler,
            orders,
            eligibility: EligibilityService::new(policies),
        }
    }

    pub fn policies(&self) -> &PolicyService {
        self.eligibility.policies()
    }

    pub async fn get_return(&self, return_id: AggregateId) -> Result<Option<Return>> {
        self.handler.get(return_id).await
    }

    pub async fn returns_for_order(&self, order_id: AggregateId) -> Result<Vec<Return>> {
        Ok(self.handler.repository().find_by_order_id(order_id).await?)
    }

    /// Runs the eligibility pre-checks for an order without opening a return.
    #[tracing::instrument(skip(self))]
    pub async fn check_eligibility(
        &self,
        order_id: AggregateId,
        category: &str,
        is_custom_product: bool,
    ) -> Result<EligibilityResult> {
        let (order, delivered_at) = self.delivered_order(order_id).await?;
        Ok(self.eligibility.check_eligibility(
            delivered_at,
            category,
            &order.total_amount,
            is_custom_product,
        ))
    }

    /// Opens a return for a delivered order.
    ///
    /// The request must pass the eligibility checks under the policy that
    /// applies to the customer, and the order must not already have a
    /// return in progress.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id))]
    pub async fn request_return(&self, cmd: RequestReturn) -> Result<CommandResult<Return>> {
        const COMMAND: &str = "request_return";

        let (order, delivery_date) = self
            .delivered_order(cmd.order_id)
            .await
            .map_err(|e| self.handler.reject(COMMAND, e))?;
        let policy = self
            .policies()
            .policy_for(&cmd.category, Some(order.customer_id), cmd.is_vip);

        let check = EligibilityService::check_policy_at(
            policy,
            delivery_date,
            &cmd.category,
            &order.total_amount,
            cmd.is_custom_product,
            Utc::now(),
        );
        if !check.is_eligible {
            let err = ReturnError::NotEligible {
                reason: check.reason,
            };
            return Err(self.handler.reject(COMMAND, err.into()));
        }

        let existing = self.returns_for_order(cmd.order_id).await?;
        if existing.iter().any(|ret| !ret.status().is_terminal()) {
            let err = ReturnError::ActiveReturnExists {
                order_id: cmd.order_id,
            };
            return Err(self.handler.reject(COMMAND, err.into()));
        }

        let request = ReturnRequest {
            order_id: order.order_id,
            customer_id: order.customer_id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            delivery_date,
            items: cmd.items,
            reason: cmd.reason,
            description: cmd.description,
            policy: check.policy,
        };
        self.handler
            .create(COMMAND, || Return::request(request))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn approve_return(
        &self,
        return_id: AggregateId,
        approved_by: UserId,
        approver_name: String,
        role: UserRole,
        notes: String,
        apply_restocking_fee: bool,
    ) -> Result<CommandResult<Return>> {
        let current = self.handler.load(return_id).await?;
        let auth = can_approve_return(role, &current.total_amount(), current.reason());
        if !auth.is_authorized {
            let err = ApplicationError::Unauthorized {
                reason: auth.reason,
                escalate_to: auth.escalation_level,
            };
            return Err(self.handler.reject("approve_return", err));
        }

        self.handler
            .execute(return_id, "approve_return", |ret| {
                ret.approve(approved_by, approver_name, notes, apply_restocking_fee)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject_return(
        &self,
        return_id: AggregateId,
        rejected_by: UserId,
        rejector_name: String,
        role: UserRole,
        reason: String,
        explanation: String,
    ) -> Result<CommandResult<Return>> {
        if !can_reject_return(role) {
            let err = ApplicationError::Unauthorized {
                reason: format!("{role} cannot reject returns"),
                escalate_to: Some(UserRole::Manager),
            };
            return Err(self.handler.reject("reject_return", err));
        }

        self.handler
            .execute(return_id, "reject_return", |ret| {
                ret.reject(rejected_by, rejector_name, reason, explanation)
            })
            .await
    }

    #[tracing::instrument(skip(self, received))]
    pub async fn receive_products(
        &self,
        return_id: AggregateId,
        received_by: UserId,
        receiver_name: String,
        received: Vec<ReceivedItem>,
        tracking_number: String,
        warehouse_location: String,
        inspection_notes: String,
    ) -> Result<CommandResult<Return>> {
        self.handler
            .execute(return_id, "receive_products", |ret| {
                ret.receive_products(
                    received_by,
                    receiver_name,
                    received,
                    tracking_number,
                    warehouse_location,
                    inspection_notes,
                )
            })
            .await
    }

    /// Works out the refund for a received return from its inspected items.
    #[tracing::instrument(skip(self))]
    pub async fn calculate_refund(
        &self,
        return_id: AggregateId,
        original_shipping_cost: Money,
        original_payment_method: &str,
    ) -> Result<RefundCalculation> {
        let ret = self.handler.load(return_id).await?;
        let lines: Vec<InspectedLine> = ret
            .items()
            .iter()
            .filter_map(|item| {
                item.received_condition().map(|condition| InspectedLine {
                    condition,
                    quantity: item.quantity_received(),
                    unit_price: item.unit_price(),
                })
            })
            .collect();

        Ok(refund_calculation::calculate(
            &ret.total_amount(),
            ret.policy(),
            &lines,
            ret.reason(),
            &original_shipping_cost,
            original_payment_method,
        )?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn accept_return(
        &self,
        return_id: AggregateId,
        accepted_by: UserId,
        accepter_name: String,
        refund_method: RefundMethod,
        refund_reference: String,
        notes: String,
        inventory_updated: bool,
    ) -> Result<CommandResult<Return>> {
        self.handler
            .execute(return_id, "accept_return", |ret| {
                ret.accept_and_process_refund(
                    accepted_by,
                    accepter_name,
                    refund_method,
                    refund_reference,
                    notes,
                    inventory_updated,
                )
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel_return(
        &self,
        return_id: AggregateId,
        reason: String,
    ) -> Result<CommandResult<Return>> {
        self.handler
            .execute(return_id, "cancel_return", |ret| ret.cancel(reason))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn complete_return(
        &self,
        return_id: AggregateId,
        refund_reference: String,
    ) -> Result<CommandResult<Return>> {
        self.handler
            .execute(return_id, "complete_return", |ret| {
                ret.complete(refund_reference)
            })
            .await
    }

    async fn delivered_order(
        &self,
        order_id: AggregateId,
    ) -> Result<(OrderSummary, DateTime<Utc>)> {
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(ApplicationError::OrderNotFound(order_id))?;
        match order.delivery_date {
            Some(delivered_at) if order.status == OrderStatus::Delivered => {
                Ok((order, delivered_at))
            }
            _ => Err(ApplicationError::OrderNotDelivered { order_id }),
        }
    }
}
