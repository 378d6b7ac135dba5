//! Shipping service.

use chrono::{DateTime, Utc};
use common::AggregateId;
use domain::{DeliveryAddress, Shipment, ShipmentError};

use crate::error::Result;
use crate::handler::{CommandHandler, CommandResult};
use crate::repository::OrderScopedRepository;

/// Service for shipments. An order has at most one shipment.
pub struct ShippingService {
    handler: CommandHandler<Shipment>,
}

impl ShippingService {
    pub fn new(handler: CommandHandler<Shipment>) -> Self {
        Self { handler }
    }

    pub async fn get_shipment(&self, shipment_id: AggregateId) -> Result<Option<Shipment>> {
        self.handler.get(shipment_id).await
    }

    pub async fn shipment_for_order(&self, order_id: AggregateId) -> Result<Option<Shipment>> {
        let found = self.handler.repository().find_by_order_id(order_id).await?;
        Ok(found.into_iter().next())
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_shipment(
        &self,
        order_id: AggregateId,
        delivery_address: DeliveryAddress,
    ) -> Result<CommandResult<Shipment>> {
        if self.shipment_for_order(order_id).await?.is_some() {
            let err = ShipmentError::AlreadyExists { order_id };
            return Err(self.handler.reject("create_shipment", err.into()));
        }
        self.handler
            .create("create_shipment", || {
                Shipment::create(order_id, delivery_address)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn prepare_shipment(
        &self,
        shipment_id: AggregateId,
        notes: String,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "prepare_shipment", |shipment| {
                shipment.prepare_for_shipment(notes)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn ship(
        &self,
        shipment_id: AggregateId,
        carrier: String,
        tracking_number: String,
        estimated_delivery_date: Option<DateTime<Utc>>,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "ship", |shipment| {
                shipment.ship(carrier, tracking_number, estimated_delivery_date)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_tracking(
        &self,
        shipment_id: AggregateId,
        location: String,
        status: String,
        notes: String,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "update_tracking", |shipment| {
                shipment.update_tracking_status(location, status, notes)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn deliver(
        &self,
        shipment_id: AggregateId,
        recipient_name: String,
        delivered_by: String,
        notes: String,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "deliver", |shipment| {
                shipment.deliver(recipient_name, delivered_by, notes)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn report_delay(
        &self,
        shipment_id: AggregateId,
        new_estimate: DateTime<Utc>,
        reason: String,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "report_delay", |shipment| {
                shipment.report_delay(new_estimate, reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_lost(
        &self,
        shipment_id: AggregateId,
        reason: String,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "mark_lost", |shipment| {
                shipment.mark_as_lost(reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_returned(
        &self,
        shipment_id: AggregateId,
        reason: String,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "mark_returned", |shipment| {
                shipment.mark_as_returned(reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_delivery_address(
        &self,
        shipment_id: AggregateId,
        new_address: DeliveryAddress,
    ) -> Result<CommandResult<Shipment>> {
        self.handler
            .execute(shipment_id, "update_delivery_address", |shipment| {
                shipment.update_delivery_address(new_address)
            })
            .await
    }
}
