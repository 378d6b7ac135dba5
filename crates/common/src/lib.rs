//! Identifier types shared by every bounded context.

#[macro_use]
mod types;

pub use types::AggregateId;
