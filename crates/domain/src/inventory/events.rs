//! Inventory domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::ReservationId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InventoryEvent {
    StockReserved(StockReservedData),
    StockReleased(StockReleasedData),
    /// A reservation became an actual outbound movement.
    StockCommitted(StockCommittedData),
    StockIncreased(StockAdjustedData),
    /// Unreserved stock was written off.
    StockDecreased(StockAdjustedData),
    LowStockDetected(LowStockDetectedData),
    ReorderPointReached(ReorderPointReachedData),
}

impl DomainEvent for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::StockReserved(_) => "StockReserved",
            InventoryEvent::StockReleased(_) => "StockReleased",
            InventoryEvent::StockCommitted(_) => "StockCommitted",
            InventoryEvent::StockIncreased(_) => "StockIncreased",
            InventoryEvent::StockDecreased(_) => "StockDecreased",
            InventoryEvent::LowStockDetected(_) => "LowStockDetected",
            InventoryEvent::ReorderPointReached(_) => "ReorderPointReached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReservedData {
    pub sku: String,
    pub reservation_id: ReservationId,
    pub quantity: u32,
    pub reason: String,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReleasedData {
    pub sku: String,
    pub reservation_id: ReservationId,
    pub quantity: u32,
    pub reason: String,
    pub released_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockCommittedData {
    pub sku: String,
    pub reservation_id: ReservationId,
    pub quantity: u32,
    pub reason: String,
    pub committed_at: DateTime<Utc>,
}

/// Payload shared by direct stock increases and decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAdjustedData {
    pub sku: String,
    pub quantity: u32,
    pub reason: String,
    /// On-hand level after the adjustment.
    pub total_on_hand: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowStockDetectedData {
    pub sku: String,
    pub current_stock: u32,
    pub minimum_stock_level: u32,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderPointReachedData {
    pub sku: String,
    pub current_stock: u32,
    pub reorder_point: u32,
    pub detected_at: DateTime<Utc>,
}
