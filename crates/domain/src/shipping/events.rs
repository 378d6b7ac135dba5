//! Shipment domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::contact::DeliveryAddress;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShipmentEvent {
    ShipmentCreated(ShipmentCreatedData),
    ShipmentPrepared(ShipmentPreparedData),
    OrderShipped(OrderShippedData),
    ShipmentTrackingUpdated(ShipmentTrackingUpdatedData),
    OrderDelivered(OrderDeliveredData),
    ShipmentDelayed(ShipmentDelayedData),
    ShipmentLost(ShipmentLostData),
    ShipmentReturned(ShipmentReturnedData),
    DeliveryAddressUpdated(DeliveryAddressUpdatedData),
}

impl DomainEvent for ShipmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ShipmentEvent::ShipmentCreated(_) => "ShipmentCreated",
            ShipmentEvent::ShipmentPrepared(_) => "ShipmentPrepared",
            ShipmentEvent::OrderShipped(_) => "OrderShipped",
            ShipmentEvent::ShipmentTrackingUpdated(_) => "ShipmentTrackingUpdated",
            ShipmentEvent::OrderDelivered(_) => "OrderDelivered",
            ShipmentEvent::ShipmentDelayed(_) => "ShipmentDelayed",
            ShipmentEvent::ShipmentLost(_) => "ShipmentLost",
            ShipmentEvent::ShipmentReturned(_) => "ShipmentReturned",
            ShipmentEvent::DeliveryAddressUpdated(_) => "DeliveryAddressUpdated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentCreatedData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub delivery_address: DeliveryAddress,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPreparedData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub notes: String,
    pub prepared_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShippedData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub carrier: String,
    pub tracking_number: String,
    pub estimated_delivery_date: DateTime<Utc>,
    pub delivery_address: DeliveryAddress,
    pub shipped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentTrackingUpdatedData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub location: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDeliveredData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub recipient_name: String,
    pub delivered_by: String,
    pub notes: String,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentDelayedData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub previous_estimate: DateTime<Utc>,
    pub new_estimate: DateTime<Utc>,
    pub reason: String,
    pub reported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentLostData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub reason: String,
    pub lost_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentReturnedData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub reason: String,
    pub returned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddressUpdatedData {
    pub shipment_id: AggregateId,
    pub order_id: AggregateId,
    pub new_address: DeliveryAddress,
    pub updated_at: DateTime<Utc>,
}
