//! Inventory service: stock levels and reservations.

use chrono::{Duration, Utc};
use common::AggregateId;
use domain::InventoryItem;
use domain::inventory::ReservationId;

use crate::error::Result;
use crate::handler::{CommandHandler, CommandResult};

/// Service for managing stock.
///
/// Reservations made through the service expire after the configured TTL.
pub struct InventoryService {
    handler: CommandHandler<InventoryItem>,
    reservation_ttl: Duration,
}

impl InventoryService {
    pub fn new(handler: CommandHandler<InventoryItem>, reservation_ttl: Duration) -> Self {
        Self {
            handler,
            reservation_ttl,
        }
    }

    pub fn handler(&self) -> &CommandHandler<InventoryItem> {
        &self.handler
    }

    pub async fn get_item(&self, item_id: AggregateId) -> Result<Option<InventoryItem>> {
        self.handler.get(item_id).await
    }

    /// Returns the item tracking `sku`, if any.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<InventoryItem>> {
        let sku = sku.to_string();
        let found = self
            .handler
            .repository()
            .find(&move |item: &InventoryItem| item.sku() == sku)
            .await?;
        Ok(found.into_iter().next())
    }

    #[tracing::instrument(skip(self))]
    pub async fn register_item(
        &self,
        sku: String,
        initial_on_hand: u32,
        minimum_stock_level: u32,
        reorder_point: u32,
    ) -> Result<CommandResult<InventoryItem>> {
        self.handler
            .create("register_item", || {
                InventoryItem::new(sku, initial_on_hand, minimum_stock_level, reorder_point)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reserve_stock(
        &self,
        item_id: AggregateId,
        reservation_id: ReservationId,
        quantity: u32,
        reason: String,
    ) -> Result<CommandResult<InventoryItem>> {
        let expires_at = Utc::now() + self.reservation_ttl;
        self.handler
            .execute(item_id, "reserve_stock", |item| {
                item.reserve(reservation_id, quantity, reason, Some(expires_at))
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn release_reservation(
        &self,
        item_id: AggregateId,
        reservation_id: ReservationId,
        quantity: u32,
        reason: String,
    ) -> Result<CommandResult<InventoryItem>> {
        self.handler
            .execute(item_id, "release_reservation", |item| {
                item.release(reservation_id, quantity, reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn commit_reservation(
        &self,
        item_id: AggregateId,
        reservation_id: ReservationId,
        reason: String,
    ) -> Result<CommandResult<InventoryItem>> {
        self.handler
            .execute(item_id, "commit_reservation", |item| {
                item.commit_reservation(reservation_id, reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn increase_stock(
        &self,
        item_id: AggregateId,
        quantity: u32,
        reason: String,
    ) -> Result<CommandResult<InventoryItem>> {
        self.handler
            .execute(item_id, "increase_stock", |item| {
                item.increase_stock(quantity, reason)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn decrease_stock(
        &self,
        item_id: AggregateId,
        quantity: u32,
        reason: String,
    ) -> Result<CommandResult<InventoryItem>> {
        self.handler
            .execute(item_id, "decrease_stock", |item| {
                item.decrease_stock(quantity, reason)
            })
            .await
    }
}
