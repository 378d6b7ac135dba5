//! One service per bounded context, each wrapping a [`CommandHandler`](crate::handler::CommandHandler).

mod inventory;
mod order;
mod payment;
mod returns;
mod shipping;

pub use inventory::InventoryService;
pub use order::OrderService;
pub use payment::PaymentService;
pub use returns::ReturnService;
pub use shipping::ShippingService;
