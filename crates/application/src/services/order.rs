//! Order service providing a simplified API for order operations.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::order::{OrderModification, RequestedChanges, cancellation_fee};
use domain::{Money, Order, UserId};

use crate::commands::PlaceOrder;
use crate::error::Result;
use crate::handler::{CommandHandler, CommandResult};

/// Service for managing orders.
pub struct OrderService {
    handler: CommandHandler<Order>,
}

impl OrderService {
    pub fn new(handler: CommandHandler<Order>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &CommandHandler<Order> {
        &self.handler
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>> {
        self.handler.get(order_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<CommandResult<Order>> {
        self.handler
            .create("place_order", || {
                Order::place(
                    cmd.customer_id,
                    cmd.customer_info,
                    cmd.items,
                    cmd.shipping_address,
                    cmd.payment_method,
                )
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn validate_order(&self, order_id: AggregateId) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "validate_order", |order| order.validate())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reject_order(
        &self,
        order_id: AggregateId,
        reason: String,
    ) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "reject_order", |order| order.reject(reason))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn confirm_order(
        &self,
        order_id: AggregateId,
        confirmed_by: UserId,
        estimated_delivery_date: DateTime<Utc>,
    ) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "confirm_order", |order| {
                order.confirm(confirmed_by, estimated_delivery_date)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn request_cancellation(
        &self,
        order_id: AggregateId,
        reason: String,
        requested_by: UserId,
    ) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "request_cancellation", |order| {
                order.request_cancellation(reason, requested_by)
            })
            .await
    }

    /// Cancels the order and returns the fee owed for cancelling it in the
    /// status it was in.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: AggregateId,
        reason: String,
        requested_by: UserId,
    ) -> Result<(CommandResult<Order>, Money)> {
        let mut fee = None;
        let result = self
            .handler
            .execute(order_id, "cancel_order", |order| {
                fee = Some(cancellation_fee(order)?);
                order.cancel(reason, requested_by)
            })
            .await?;
        let fee = fee.unwrap_or_else(|| Money::zero(result.aggregate.total_amount().currency()));
        Ok((result, fee))
    }

    #[tracing::instrument(skip(self))]
    pub async fn request_modification(
        &self,
        order_id: AggregateId,
        description: String,
        requested_by: UserId,
        changes: RequestedChanges,
    ) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "request_modification", |order| {
                order.request_modification(description, requested_by, changes)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn modify_order(
        &self,
        order_id: AggregateId,
        modification: OrderModification,
    ) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "modify_order", |order| order.modify(modification))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        order_id: AggregateId,
        payment_id: AggregateId,
        paid_amount: Money,
    ) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "mark_paid", |order| {
                order.mark_as_paid(payment_id, paid_amount)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_shipped(
        &self,
        order_id: AggregateId,
        awb_number: String,
    ) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "mark_shipped", |order| {
                order.mark_as_shipped(awb_number)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_delivered(&self, order_id: AggregateId) -> Result<CommandResult<Order>> {
        self.handler
            .execute(order_id, "mark_delivered", |order| order.mark_as_delivered())
            .await
    }
}
