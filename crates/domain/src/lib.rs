//! Domain layer for order fulfillment.
//!
//! Five bounded contexts each own one or two aggregates:
//! - [`inventory`]: stock levels and reservations per SKU
//! - [`order`]: customer orders and their confirmation, cancellation and modification
//! - [`payment`]: payments, refunds, retry policy and fraud screening
//! - [`returns`]: return authorizations and the policies around them
//! - [`shipping`]: parcel delivery with tracking history
//!
//! Every aggregate is mutated only through command methods that either
//! apply completely or leave it untouched, and records the events it
//! produced until the caller drains them.

pub mod aggregate;
pub mod contact;
pub mod error;
pub mod ids;
pub mod inventory;
pub mod money;
pub mod order;
pub mod payment;
pub mod returns;
pub mod shipping;

pub use aggregate::{Aggregate, DomainEvent, PendingEvents};
pub use contact::{CustomerInfo, DeliveryAddress, ShippingAddress, ValidationError};
pub use error::{DomainError, ErrorKind, InvariantViolation};
pub use ids::{CustomerId, ProductId, UserId};
pub use inventory::{InventoryError, InventoryEvent, InventoryItem, ReservationId};
pub use money::{Currency, Money, MoneyError};
pub use order::{Order, OrderError, OrderEvent, OrderStatus};
pub use payment::{Payment, PaymentError, PaymentEvent, Refund, RefundEvent};
pub use returns::{Return, ReturnError, ReturnEvent};
pub use shipping::{Shipment, ShipmentError, ShipmentEvent};
