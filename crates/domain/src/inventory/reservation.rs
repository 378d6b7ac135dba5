use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::InventoryError;

common::uuid_id!(
    /// Caller-chosen reservation identifier. Reusing one is rejected, which
    /// makes reserving idempotent for retried requests.
    ReservationId
);

/// A hold on part of an item's on-hand stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    quantity: u32,
    reason: String,
    reserved_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Reservation {
    pub(crate) fn new(
        id: ReservationId,
        quantity: u32,
        reason: String,
        reserved_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            quantity,
            reason,
            reserved_at,
            expires_at,
        }
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn reserved_at(&self) -> DateTime<Utc> {
        self.reserved_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Shrinks the hold by `by` units and returns what remains.
    pub(crate) fn reduce(&mut self, by: u32) -> Result<u32, InventoryError> {
        if by == 0 {
            return Err(InventoryError::InvalidQuantity { quantity: by });
        }
        self.quantity = self
            .quantity
            .checked_sub(by)
            .ok_or(InventoryError::ReleaseExceedsReserved {
                reserved: self.quantity,
                requested: by,
            })?;
        Ok(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn reservation(quantity: u32) -> Reservation {
        let now = Utc::now();
        Reservation::new(
            ReservationId::new(),
            quantity,
            "order".to_string(),
            now,
            now + Duration::hours(1),
        )
    }

    #[test]
    fn reduce_returns_remaining() {
        let mut r = reservation(5);
        assert_eq!(r.reduce(2), Ok(3));
        assert_eq!(r.reduce(3), Ok(0));
    }

    #[test]
    fn reduce_beyond_quantity_is_rejected_unchanged() {
        let mut r = reservation(2);
        assert_eq!(
            r.reduce(3),
            Err(InventoryError::ReleaseExceedsReserved {
                reserved: 2,
                requested: 3
            })
        );
        assert_eq!(r.quantity(), 2);
    }

    #[test]
    fn expiry_is_inclusive() {
        let r = reservation(1);
        assert!(!r.is_expired_at(r.expires_at() - Duration::seconds(1)));
        assert!(r.is_expired_at(r.expires_at()));
    }
}
