//! Application layer for order fulfillment.
//!
//! Runs domain commands end to end: a [`CommandHandler`] loads an
//! aggregate, applies the command, saves it with an optimistic version
//! check and publishes the events it recorded. One service per bounded
//! context sits on top, together with the external collaborators they need
//! (payment gateway, fraud screening, order lookups) and the periodic
//! [`ReservationSweeper`].

pub mod app;
pub mod collaborators;
pub mod commands;
pub mod config;
pub mod error;
pub mod handler;
pub mod repository;
pub mod services;
pub mod sweeper;
pub mod telemetry;

pub use app::{Fulfillment, InMemoryBackends};
pub use config::{Config, LogFormat};
pub use error::{ApplicationError, Result};
pub use handler::{CommandHandler, CommandResult};
pub use repository::{OrderScoped, OrderScopedRepository};
pub use sweeper::{ReservationSweeper, SweepReport};
