//! Systems the services depend on but do not own.

mod fraud;
mod gateway;
mod orders;

pub use fraud::{FraudDetection, InMemoryFraudDetection};
pub use gateway::{
    GatewayError, GatewayResponse, InMemoryPaymentGateway, PaymentGateway, ScriptedOutcome,
};
pub use orders::{OrderDirectory, OrderSummary, RepositoryOrderDirectory};
