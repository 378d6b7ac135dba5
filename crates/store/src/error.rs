use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors raised by repositories and the event log.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The saved entity was loaded at a version other than the stored one.
    #[error(
        "Concurrent modification of {entity_type} {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrentModification {
        entity_type: &'static str,
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// No entity is stored under the id.
    #[error("{entity_type} not found: {aggregate_id}")]
    NotFound {
        entity_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// An envelope was built without one of its required fields.
    #[error("Event envelope is missing required field `{0}`")]
    IncompleteEnvelope(&'static str),

    /// Entity state or event payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for optimistic concurrency failures, which callers may
    /// retry after reloading.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrentModification { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
