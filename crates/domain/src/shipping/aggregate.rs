//! Shipment aggregate.

use chrono::{DateTime, Duration, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};
use store::{Entity, Version};

use crate::aggregate::{Aggregate, PendingEvents, transact};
use crate::contact::DeliveryAddress;
use crate::error::InvariantViolation;

use super::{
    DeliveryAddressUpdatedData, OrderDeliveredData, OrderShippedData, ShipmentCreatedData,
    ShipmentDelayedData, ShipmentError, ShipmentEvent, ShipmentLostData, ShipmentPreparedData,
    ShipmentReturnedData, ShipmentStatus, ShipmentTrackingUpdatedData,
};

/// Delivery estimate used when the carrier gives none.
pub const DEFAULT_DELIVERY_DAYS: i64 = 3;

/// One entry in a shipment's tracking history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub location: String,
}

/// Physical delivery of one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    id: AggregateId,

    #[serde(default)]
    version: Version,

    order_id: AggregateId,
    status: ShipmentStatus,
    delivery_address: DeliveryAddress,
    carrier: Option<String>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    prepared_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    estimated_delivery_date: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    delivered_by: Option<String>,
    recipient_name: Option<String>,
    delivery_notes: Option<String>,
    tracking_events: Vec<TrackingEvent>,

    #[serde(skip)]
    pending: PendingEvents<ShipmentEvent>,
}

impl Entity for Shipment {
    fn entity_type() -> &'static str {
        "Shipment"
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

impl Aggregate for Shipment {
    type Event = ShipmentEvent;
    type Error = ShipmentError;

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |message: &str| InvariantViolation::new(Self::entity_type(), message);
        let filled = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

        if self.status.is_shipped() {
            if !filled(&self.carrier) || !filled(&self.tracking_number) {
                return Err(violation("carrier and tracking number required after shipping"));
            }
            if self.shipped_at.is_none() {
                return Err(violation("shipped without a shipping time"));
            }
        }
        if let (Some(delivered), Some(shipped)) = (self.delivered_at, self.shipped_at) {
            if delivered < shipped {
                return Err(violation("delivered before shipped"));
            }
        }
        if self.status == ShipmentStatus::Delivered && self.delivered_at.is_none() {
            return Err(violation("delivered without a delivery time"));
        }
        Ok(())
    }

    fn pending(&self) -> &PendingEvents<ShipmentEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<ShipmentEvent> {
        &mut self.pending
    }
}

impl Shipment {
    pub fn order_id(&self) -> AggregateId {
        self.order_id
    }

    pub fn status(&self) -> ShipmentStatus {
        self.status
    }

    pub fn delivery_address(&self) -> &DeliveryAddress {
        &self.delivery_address
    }

    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn prepared_at(&self) -> Option<DateTime<Utc>> {
        self.prepared_at
    }

    pub fn shipped_at(&self) -> Option<DateTime<Utc>> {
        self.shipped_at
    }

    pub fn estimated_delivery_date(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery_date
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        self.delivered_at
    }

    pub fn delivered_by(&self) -> Option<&str> {
        self.delivered_by.as_deref()
    }

    pub fn recipient_name(&self) -> Option<&str> {
        self.recipient_name.as_deref()
    }

    pub fn delivery_notes(&self) -> Option<&str> {
        self.delivery_notes.as_deref()
    }

    /// Tracking history, oldest first.
    pub fn tracking_events(&self) -> &[TrackingEvent] {
        &self.tracking_events
    }

    pub fn is_delivered(&self) -> bool {
        self.status == ShipmentStatus::Delivered
    }

    pub fn is_shipped(&self) -> bool {
        self.status.is_shipped()
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }

    pub fn is_delayed_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_delivered() && self.estimated_delivery_date.is_some_and(|eta| eta < now)
    }

    pub fn is_delayed(&self) -> bool {
        self.is_delayed_at(Utc::now())
    }

    pub fn create(
        order_id: AggregateId,
        delivery_address: DeliveryAddress,
    ) -> Result<Self, ShipmentError> {
        let now = Utc::now();
        let mut shipment = Self {
            id: AggregateId::new(),
            version: Version::initial(),
            order_id,
            status: ShipmentStatus::Created,
            delivery_address,
            carrier: None,
            tracking_number: None,
            created_at: now,
            prepared_at: None,
            shipped_at: None,
            estimated_delivery_date: None,
            delivered_at: None,
            delivered_by: None,
            recipient_name: None,
            delivery_notes: None,
            tracking_events: Vec::new(),
            pending: PendingEvents::default(),
        };
        shipment.check_invariants()?;

        let created = ShipmentEvent::ShipmentCreated(ShipmentCreatedData {
            shipment_id: shipment.id,
            order_id,
            delivery_address: shipment.delivery_address.clone(),
            created_at: now,
        });
        shipment.pending.extend([created]);
        Ok(shipment)
    }

    /// Packing and labelling done at the warehouse.
    pub fn prepare_for_shipment(
        &mut self,
        notes: impl Into<String>,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(self.status.can_prepare(), "prepare")?;

        let notes = notes.into();
        let now = Utc::now();
        transact(self, |shipment| {
            shipment.status = ShipmentStatus::Prepared;
            shipment.prepared_at = Some(now);
            shipment.track(now, "Shipment prepared for dispatch", "Warehouse");
            Ok(vec![ShipmentEvent::ShipmentPrepared(ShipmentPreparedData {
                shipment_id: shipment.id,
                order_id: shipment.order_id,
                notes,
                prepared_at: now,
            })])
        })
    }

    /// Hands the parcel to `carrier`. Without an estimate, delivery is
    /// expected [`DEFAULT_DELIVERY_DAYS`] after shipping.
    pub fn ship(
        &mut self,
        carrier: impl Into<String>,
        tracking_number: impl Into<String>,
        estimated_delivery_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(self.status.can_ship(), "ship")?;
        let carrier = carrier.into();
        let tracking_number = tracking_number.into();
        if carrier.trim().is_empty() {
            return Err(ShipmentError::Required("carrier"));
        }
        if tracking_number.trim().is_empty() {
            return Err(ShipmentError::Required("tracking number"));
        }

        let now = Utc::now();
        if let Some(estimate) = estimated_delivery_date {
            if estimate <= now {
                return Err(ShipmentError::EstimateNotInFuture { estimate });
            }
        }
        let estimate =
            estimated_delivery_date.unwrap_or(now + Duration::days(DEFAULT_DELIVERY_DAYS));

        transact(self, |shipment| {
            shipment.status = ShipmentStatus::Shipped;
            shipment.carrier = Some(carrier.clone());
            shipment.tracking_number = Some(tracking_number.clone());
            shipment.shipped_at = Some(now);
            shipment.estimated_delivery_date = Some(estimate);
            shipment.track(now, format!("Shipped via {carrier}"), carrier.clone());
            Ok(vec![ShipmentEvent::OrderShipped(OrderShippedData {
                shipment_id: shipment.id,
                order_id: shipment.order_id,
                carrier,
                tracking_number,
                estimated_delivery_date: estimate,
                delivery_address: shipment.delivery_address.clone(),
                shipped_at: now,
            })])
        })
    }

    /// Records a carrier scan. The first scan moves the shipment in transit.
    pub fn update_tracking_status(
        &mut self,
        location: impl Into<String>,
        status: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(self.status.is_in_flight(), "update tracking for")?;
        let location = location.into();
        let status = status.into();
        if status.trim().is_empty() {
            return Err(ShipmentError::Required("tracking status"));
        }
        let notes = notes.into();

        let now = Utc::now();
        transact(self, |shipment| {
            let description = if notes.trim().is_empty() {
                status.clone()
            } else {
                format!("{status} - {notes}")
            };
            shipment.track(now, description, location.clone());
            if shipment.status == ShipmentStatus::Shipped {
                shipment.status = ShipmentStatus::InTransit;
            }
            Ok(vec![ShipmentEvent::ShipmentTrackingUpdated(
                ShipmentTrackingUpdatedData {
                    shipment_id: shipment.id,
                    order_id: shipment.order_id,
                    location,
                    status,
                    updated_at: now,
                },
            )])
        })
    }

    pub fn deliver(
        &mut self,
        recipient_name: impl Into<String>,
        delivered_by: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(self.status.is_in_flight(), "deliver")?;
        let recipient_name = recipient_name.into();
        if recipient_name.trim().is_empty() {
            return Err(ShipmentError::Required("recipient name"));
        }
        let delivered_by = Some(delivered_by.into())
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let notes = notes.into();

        let now = Utc::now();
        transact(self, |shipment| {
            shipment.status = ShipmentStatus::Delivered;
            shipment.delivered_at = Some(now);
            shipment.recipient_name = Some(recipient_name.clone());
            shipment.delivered_by = Some(delivered_by.clone());
            shipment.delivery_notes = Some(notes.clone());
            shipment.track(now, format!("Delivered to {recipient_name}"), "Destination");
            Ok(vec![ShipmentEvent::OrderDelivered(OrderDeliveredData {
                shipment_id: shipment.id,
                order_id: shipment.order_id,
                recipient_name,
                delivered_by,
                notes,
                delivered_at: now,
            })])
        })
    }

    /// Pushes the delivery estimate back. The new estimate must be later
    /// than the current one.
    pub fn report_delay(
        &mut self,
        new_estimate: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(self.status.is_in_flight(), "report delay for")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ShipmentError::Required("delay reason"));
        }
        let current = self
            .estimated_delivery_date
            .ok_or(ShipmentError::Required("estimated delivery date"))?;
        if new_estimate <= current {
            return Err(ShipmentError::DelayNotLater {
                current,
                proposed: new_estimate,
            });
        }

        let now = Utc::now();
        transact(self, |shipment| {
            shipment.estimated_delivery_date = Some(new_estimate);
            let carrier = shipment.carrier.clone().unwrap_or_default();
            shipment.track(now, format!("Delivery delayed: {reason}"), carrier);
            Ok(vec![ShipmentEvent::ShipmentDelayed(ShipmentDelayedData {
                shipment_id: shipment.id,
                order_id: shipment.order_id,
                previous_estimate: current,
                new_estimate,
                reason,
                reported_at: now,
            })])
        })
    }

    pub fn mark_as_lost(
        &mut self,
        reason: impl Into<String>,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(self.status.is_in_flight(), "mark as lost")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ShipmentError::Required("loss reason"));
        }

        let now = Utc::now();
        transact(self, |shipment| {
            shipment.status = ShipmentStatus::Lost;
            shipment.track(now, format!("Shipment lost: {reason}"), "System");
            Ok(vec![ShipmentEvent::ShipmentLost(ShipmentLostData {
                shipment_id: shipment.id,
                order_id: shipment.order_id,
                reason,
                lost_at: now,
            })])
        })
    }

    /// Delivery failed and the carrier is sending the parcel back.
    pub fn mark_as_returned(
        &mut self,
        reason: impl Into<String>,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(self.status.is_in_flight(), "mark as returned")?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ShipmentError::Required("return reason"));
        }

        let now = Utc::now();
        transact(self, |shipment| {
            shipment.status = ShipmentStatus::Returned;
            shipment.track(now, format!("Shipment returned: {reason}"), "Carrier");
            Ok(vec![ShipmentEvent::ShipmentReturned(ShipmentReturnedData {
                shipment_id: shipment.id,
                order_id: shipment.order_id,
                reason,
                returned_at: now,
            })])
        })
    }

    pub fn update_delivery_address(
        &mut self,
        new_address: DeliveryAddress,
    ) -> Result<Vec<ShipmentEvent>, ShipmentError> {
        self.ensure(!self.status.is_shipped(), "update address of")?;

        let now = Utc::now();
        transact(self, |shipment| {
            shipment.delivery_address = new_address.clone();
            shipment.track(now, "Delivery address updated", "System");
            Ok(vec![ShipmentEvent::DeliveryAddressUpdated(
                DeliveryAddressUpdatedData {
                    shipment_id: shipment.id,
                    order_id: shipment.order_id,
                    new_address,
                    updated_at: now,
                },
            )])
        })
    }

    fn track(
        &mut self,
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
        location: impl Into<String>,
    ) {
        self.tracking_events.push(TrackingEvent {
            timestamp,
            description: description.into(),
            location: location.into(),
        });
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<(), ShipmentError> {
        if allowed {
            Ok(())
        } else {
            Err(ShipmentError::InvalidStateTransition {
                current_state: self.status,
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::aggregate::DomainEvent;

    use super::*;

    fn address() -> DeliveryAddress {
        DeliveryAddress::new("Ana Pop", "Str. Lunga 1", "Cluj-Napoca", "400001", "Romania").unwrap()
    }

    fn created() -> Shipment {
        Shipment::create(AggregateId::new(), address()).unwrap()
    }

    fn shipped() -> Shipment {
        let mut shipment = created();
        shipment.prepare_for_shipment("").unwrap();
        shipment.ship("FanCourier", "FC123456", None).unwrap();
        shipment
    }

    #[test]
    fn test_happy_path_records_tracking_history() {
        let mut shipment = shipped();
        shipment
            .update_tracking_status("Sibiu hub", "Sorted", "")
            .unwrap();
        assert_eq!(shipment.status(), ShipmentStatus::InTransit);

        shipment.deliver("Ana Pop", "Courier 7", "Left at door").unwrap();
        assert!(shipment.is_delivered());
        assert!(shipment.delivered_at() >= shipment.shipped_at());

        let descriptions: Vec<_> = shipment
            .tracking_events()
            .iter()
            .map(|e| e.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            [
                "Shipment prepared for dispatch",
                "Shipped via FanCourier",
                "Sorted",
                "Delivered to Ana Pop"
            ]
        );

        let types: Vec<_> = shipment.pending_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            [
                "ShipmentCreated",
                "ShipmentPrepared",
                "OrderShipped",
                "ShipmentTrackingUpdated",
                "OrderDelivered"
            ]
        );
    }

    #[test]
    fn test_default_estimate_is_three_days() {
        let shipment = shipped();
        let shipped_at = shipment.shipped_at().unwrap();

        assert_eq!(
            shipment.estimated_delivery_date(),
            Some(shipped_at + Duration::days(DEFAULT_DELIVERY_DAYS))
        );
        assert!(!shipment.is_delayed());
        assert!(shipment.is_delayed_at(shipped_at + Duration::days(4)));
    }

    #[test]
    fn test_ship_requires_preparation_and_carrier() {
        let mut shipment = created();
        assert!(matches!(
            shipment.ship("DHL", "X1", None),
            Err(ShipmentError::InvalidStateTransition { .. })
        ));

        shipment.prepare_for_shipment("boxed").unwrap();
        assert_eq!(
            shipment.ship(" ", "X1", None),
            Err(ShipmentError::Required("carrier"))
        );
        assert!(matches!(
            shipment.ship("DHL", "X1", Some(Utc::now() - Duration::hours(1))),
            Err(ShipmentError::EstimateNotInFuture { .. })
        ));
        assert_eq!(shipment.status(), ShipmentStatus::Prepared);
    }

    #[test]
    fn test_cannot_deliver_unshipped() {
        let mut shipment = created();
        assert!(shipment.deliver("Ana", "Courier", "").is_err());
        assert!(shipment.delivered_at().is_none());
    }

    #[test]
    fn test_delivered_is_final() {
        let mut shipment = shipped();
        shipment.deliver("Ana Pop", "", "").unwrap();

        assert_eq!(shipment.delivered_by(), Some("Unknown"));
        assert!(shipment.deliver("Ana Pop", "", "").is_err());
        assert!(shipment.mark_as_lost("vanished").is_err());
        assert!(shipment.update_tracking_status("Hub", "Scan", "").is_err());
    }

    #[test]
    fn test_lost_and_returned_only_in_flight() {
        let mut prepared = created();
        prepared.prepare_for_shipment("").unwrap();
        assert!(prepared.mark_as_returned("refused").is_err());

        let mut lost = shipped();
        lost.mark_as_lost("Truck fire").unwrap();
        assert_eq!(lost.status(), ShipmentStatus::Lost);

        let mut returned = shipped();
        returned.mark_as_returned("Recipient refused").unwrap();
        assert_eq!(returned.status(), ShipmentStatus::Returned);
        assert_eq!(
            returned.tracking_events().last().map(|e| e.location.as_str()),
            Some("Carrier")
        );
    }

    #[test]
    fn test_report_delay_must_move_estimate_later() {
        let mut shipment = shipped();
        let current = shipment.estimated_delivery_date().unwrap();

        assert!(matches!(
            shipment.report_delay(current, "Weather"),
            Err(ShipmentError::DelayNotLater { .. })
        ));

        shipment
            .report_delay(current + Duration::days(2), "Weather")
            .unwrap();
        assert_eq!(
            shipment.estimated_delivery_date(),
            Some(current + Duration::days(2))
        );
    }

    #[test]
    fn test_address_change_only_before_shipping() {
        let mut shipment = created();
        assert!(shipment.can_be_cancelled());
        let new_address =
            DeliveryAddress::new("Ion Pop", "Bd. Eroilor 5", "Brasov", "500001", "Romania").unwrap();

        shipment.update_delivery_address(new_address.clone()).unwrap();
        assert_eq!(shipment.delivery_address(), &new_address);

        let mut on_the_road = shipped();
        assert!(!on_the_road.can_be_cancelled());
        assert!(matches!(
            on_the_road.update_delivery_address(new_address),
            Err(ShipmentError::InvalidStateTransition { .. })
        ));
    }
}
