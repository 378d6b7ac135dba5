//! Inventory item aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};
use store::{Entity, Version};

use crate::aggregate::{Aggregate, PendingEvents, transact};
use crate::error::InvariantViolation;

use super::{
    InventoryError, InventoryEvent, LowStockDetectedData, ReorderPointReachedData, Reservation,
    ReservationId, StockAdjustedData, StockCommittedData, StockReleasedData, StockReservedData,
};

/// Lifetime of a reservation when the caller does not choose one.
pub const DEFAULT_RESERVATION_TTL_HOURS: i64 = 24;

/// Release reason recorded when a reservation times out.
pub const EXPIRED_RESERVATION_REASON: &str = "Reservation expired";

/// On-hand stock for one SKU plus the reservations held against it.
///
/// Invariants, checked after every command:
/// - every reservation holds a positive quantity
/// - the sum of reserved quantities never exceeds `total_on_hand`
///
/// `total_on_hand >= 0` and `available >= 0` follow from the unsigned
/// representation together with the second rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    id: AggregateId,

    #[serde(default)]
    version: Version,

    sku: String,
    total_on_hand: u32,
    minimum_stock_level: u32,
    reorder_point: u32,
    reservations: BTreeMap<ReservationId, Reservation>,
    updated_at: DateTime<Utc>,

    #[serde(skip)]
    pending: PendingEvents<InventoryEvent>,
}

impl Entity for InventoryItem {
    fn entity_type() -> &'static str {
        "InventoryItem"
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

impl Aggregate for InventoryItem {
    type Event = InventoryEvent;
    type Error = InventoryError;

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let violation = |message: String| InvariantViolation::new(Self::entity_type(), message);

        if self.sku.trim().is_empty() {
            return Err(violation("SKU is empty".to_string()));
        }
        if let Some(r) = self.reservations.values().find(|r| r.quantity() == 0) {
            return Err(violation(format!("reservation {} holds no stock", r.id())));
        }
        let reserved = self.reserved_total();
        if reserved > u64::from(self.total_on_hand) {
            return Err(violation(format!(
                "reserved {reserved} exceeds on hand {}",
                self.total_on_hand
            )));
        }
        Ok(())
    }

    fn pending(&self) -> &PendingEvents<InventoryEvent> {
        &self.pending
    }

    fn pending_mut(&mut self) -> &mut PendingEvents<InventoryEvent> {
        &mut self.pending
    }
}

// Queries
impl InventoryItem {
    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn total_on_hand(&self) -> u32 {
        self.total_on_hand
    }

    pub fn minimum_stock_level(&self) -> u32 {
        self.minimum_stock_level
    }

    pub fn reorder_point(&self) -> u32 {
        self.reorder_point
    }

    /// Units currently held by reservations.
    pub fn reserved_quantity(&self) -> u32 {
        u32::try_from(self.reserved_total()).unwrap_or(u32::MAX)
    }

    /// Units free to reserve.
    pub fn available_quantity(&self) -> u32 {
        self.total_on_hand.saturating_sub(self.reserved_quantity())
    }

    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.get(&id)
    }

    pub fn is_low_stock(&self) -> bool {
        self.total_on_hand <= self.minimum_stock_level
    }

    pub fn needs_reorder(&self) -> bool {
        self.total_on_hand <= self.reorder_point
    }

    pub fn has_expired_reservations_at(&self, now: DateTime<Utc>) -> bool {
        self.reservations.values().any(|r| r.is_expired_at(now))
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn reserved_total(&self) -> u64 {
        self.reservations
            .values()
            .map(|r| u64::from(r.quantity()))
            .sum()
    }
}

// Commands
impl InventoryItem {
    /// Registers a SKU with its starting stock level and thresholds.
    pub fn new(
        sku: impl Into<String>,
        initial_on_hand: u32,
        minimum_stock_level: u32,
        reorder_point: u32,
    ) -> Result<Self, InventoryError> {
        let sku = sku.into();
        if sku.trim().is_empty() {
            return Err(InventoryError::EmptySku);
        }
        let item = Self {
            id: AggregateId::new(),
            version: Version::initial(),
            sku,
            total_on_hand: initial_on_hand,
            minimum_stock_level,
            reorder_point,
            reservations: BTreeMap::new(),
            updated_at: Utc::now(),
            pending: PendingEvents::default(),
        };
        item.check_invariants()?;
        Ok(item)
    }

    /// Holds `quantity` units under `reservation_id`.
    ///
    /// Without an explicit expiry the hold lasts
    /// [`DEFAULT_RESERVATION_TTL_HOURS`].
    pub fn reserve(
        &mut self,
        reservation_id: ReservationId,
        quantity: u32,
        reason: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<InventoryEvent>, InventoryError> {
        let now = Utc::now();

        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        if self.reservations.contains_key(&reservation_id) {
            return Err(InventoryError::DuplicateReservation { reservation_id });
        }
        let available = self.available_quantity();
        if quantity > available {
            return Err(InventoryError::InsufficientStock {
                sku: self.sku.clone(),
                available,
                requested: quantity,
            });
        }
        let expires_at =
            expires_at.unwrap_or_else(|| now + Duration::hours(DEFAULT_RESERVATION_TTL_HOURS));
        if expires_at <= now {
            return Err(InventoryError::ExpiryNotInFuture { expires_at });
        }

        let reason = reason.into();
        transact(self, |item| {
            item.reservations.insert(
                reservation_id,
                Reservation::new(reservation_id, quantity, reason.clone(), now, expires_at),
            );
            item.updated_at = now;
            Ok(vec![InventoryEvent::StockReserved(StockReservedData {
                sku: item.sku.clone(),
                reservation_id,
                quantity,
                reason,
                reserved_at: now,
                expires_at,
            })])
        })
    }

    /// Returns `quantity` units of a reservation to available stock. The
    /// reservation disappears once nothing is left on it.
    pub fn release(
        &mut self,
        reservation_id: ReservationId,
        quantity: u32,
        reason: impl Into<String>,
    ) -> Result<Vec<InventoryEvent>, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        if !self.reservations.contains_key(&reservation_id) {
            return Err(InventoryError::ReservationNotFound { reservation_id });
        }

        let reason = reason.into();
        let now = Utc::now();
        transact(self, |item| {
            let reservation = item
                .reservations
                .get_mut(&reservation_id)
                .ok_or(InventoryError::ReservationNotFound { reservation_id })?;
            if reservation.reduce(quantity)? == 0 {
                item.reservations.remove(&reservation_id);
            }
            item.updated_at = now;
            Ok(vec![InventoryEvent::StockReleased(StockReleasedData {
                sku: item.sku.clone(),
                reservation_id,
                quantity,
                reason,
                released_at: now,
            })])
        })
    }

    /// Turns a reservation into an outbound movement: the reserved units
    /// leave on-hand stock and the reservation is removed.
    ///
    /// This is the only way reserved stock leaves the warehouse;
    /// [`decrease_stock`](Self::decrease_stock) never touches reserved units.
    pub fn commit_reservation(
        &mut self,
        reservation_id: ReservationId,
        reason: impl Into<String>,
    ) -> Result<Vec<InventoryEvent>, InventoryError> {
        let quantity = self
            .reservations
            .get(&reservation_id)
            .map(Reservation::quantity)
            .ok_or(InventoryError::ReservationNotFound { reservation_id })?;

        let reason = reason.into();
        let now = Utc::now();
        transact(self, |item| {
            let before = item.total_on_hand;
            item.reservations.remove(&reservation_id);
            item.total_on_hand = before.checked_sub(quantity).ok_or_else(|| {
                InvariantViolation::new(
                    Self::entity_type(),
                    format!("commit of {quantity} exceeds on hand {before}"),
                )
            })?;
            item.updated_at = now;

            let mut events = vec![InventoryEvent::StockCommitted(StockCommittedData {
                sku: item.sku.clone(),
                reservation_id,
                quantity,
                reason,
                committed_at: now,
            })];
            events.extend(item.threshold_events(before, now));
            Ok(events)
        })
    }

    pub fn increase_stock(
        &mut self,
        quantity: u32,
        reason: impl Into<String>,
    ) -> Result<Vec<InventoryEvent>, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        let total_on_hand = self
            .total_on_hand
            .checked_add(quantity)
            .ok_or(InventoryError::QuantityOverflow)?;

        let reason = reason.into();
        let now = Utc::now();
        transact(self, |item| {
            item.total_on_hand = total_on_hand;
            item.updated_at = now;
            Ok(vec![InventoryEvent::StockIncreased(StockAdjustedData {
                sku: item.sku.clone(),
                quantity,
                reason,
                total_on_hand,
                occurred_at: now,
            })])
        })
    }

    /// Writes off unreserved stock (damage, loss, correction).
    pub fn decrease_stock(
        &mut self,
        quantity: u32,
        reason: impl Into<String>,
    ) -> Result<Vec<InventoryEvent>, InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        if quantity > self.total_on_hand {
            return Err(InventoryError::InsufficientOnHand {
                on_hand: self.total_on_hand,
                requested: quantity,
            });
        }
        let available = self.available_quantity();
        if quantity > available {
            return Err(InventoryError::WouldUndercutReservations {
                available,
                requested: quantity,
            });
        }

        let reason = reason.into();
        let now = Utc::now();
        transact(self, |item| {
            let before = item.total_on_hand;
            item.total_on_hand = before - quantity;
            item.updated_at = now;

            let mut events = vec![InventoryEvent::StockDecreased(StockAdjustedData {
                sku: item.sku.clone(),
                quantity,
                reason,
                total_on_hand: item.total_on_hand,
                occurred_at: now,
            })];
            events.extend(item.threshold_events(before, now));
            Ok(events)
        })
    }

    /// Releases every reservation whose expiry is at or before `now`.
    ///
    /// Returns no events (and changes nothing) when nothing has expired.
    pub fn expire_reservations_at(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<Vec<InventoryEvent>, InventoryError> {
        if !self.has_expired_reservations_at(now) {
            return Ok(Vec::new());
        }

        transact(self, |item| {
            let expired: Vec<Reservation> = item
                .reservations
                .values()
                .filter(|r| r.is_expired_at(now))
                .cloned()
                .collect();

            let mut events = Vec::with_capacity(expired.len());
            for reservation in expired {
                item.reservations.remove(&reservation.id());
                events.push(InventoryEvent::StockReleased(StockReleasedData {
                    sku: item.sku.clone(),
                    reservation_id: reservation.id(),
                    quantity: reservation.quantity(),
                    reason: EXPIRED_RESERVATION_REASON.to_string(),
                    released_at: now,
                }));
            }
            item.updated_at = now;
            Ok(events)
        })
    }

    pub fn expire_reservations(&mut self) -> Result<Vec<InventoryEvent>, InventoryError> {
        self.expire_reservations_at(Utc::now())
    }

    /// Threshold notifications for a drop from `before` to the current level.
    fn threshold_events(&self, before: u32, now: DateTime<Utc>) -> Vec<InventoryEvent> {
        let after = self.total_on_hand;
        let mut events = Vec::new();
        if before > self.minimum_stock_level && after <= self.minimum_stock_level {
            events.push(InventoryEvent::LowStockDetected(LowStockDetectedData {
                sku: self.sku.clone(),
                current_stock: after,
                minimum_stock_level: self.minimum_stock_level,
                detected_at: now,
            }));
        }
        if before > self.reorder_point && after <= self.reorder_point {
            events.push(InventoryEvent::ReorderPointReached(ReorderPointReachedData {
                sku: self.sku.clone(),
                current_stock: after,
                reorder_point: self.reorder_point,
                detected_at: now,
            }));
        }
        events
    }
}
