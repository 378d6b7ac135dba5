//! Persistence collaborators for the fulfillment aggregates.
//!
//! Two narrow seams live here:
//! - [`Repository`]: keyed, versioned storage of aggregate state with
//!   optimistic concurrency on save.
//! - [`EventLog`]: the append-only sink that receives domain events once the
//!   aggregate that produced them has been saved.
//!
//! Both ship with in-memory implementations guarded by a single
//! `tokio::sync::RwLock` per collection.

pub mod error;
pub mod event;
pub mod log;
pub mod query;
pub mod repository;

pub use common::AggregateId;
pub use error::{Result, StoreError};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use log::{EventLog, InMemoryEventLog};
pub use query::EventQuery;
pub use repository::{Entity, InMemoryRepository, Repository};
