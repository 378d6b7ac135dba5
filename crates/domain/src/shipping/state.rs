//! Shipment status machine.

use serde::{Deserialize, Serialize};

/// Delivery lifecycle. Declaration order is progress order, so `>=`
/// comparisons read as "at least this far along".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ShipmentStatus {
    #[default]
    Created,
    Prepared,
    Shipped,
    InTransit,
    Delivered,
    Returned,
    Lost,
}

impl ShipmentStatus {
    pub fn can_prepare(&self) -> bool {
        matches!(self, ShipmentStatus::Created)
    }

    pub fn can_ship(&self) -> bool {
        matches!(self, ShipmentStatus::Prepared)
    }

    /// Handed to the carrier, whatever happened afterwards.
    pub fn is_shipped(&self) -> bool {
        *self >= ShipmentStatus::Shipped
    }

    /// With the carrier and not yet at a final outcome.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, ShipmentStatus::Shipped | ShipmentStatus::InTransit)
    }

    pub fn can_be_cancelled(&self) -> bool {
        !self.is_shipped()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Created => "Created",
            ShipmentStatus::Prepared => "Prepared",
            ShipmentStatus::Shipped => "Shipped",
            ShipmentStatus::InTransit => "InTransit",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Returned => "Returned",
            ShipmentStatus::Lost => "Lost",
        }
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
