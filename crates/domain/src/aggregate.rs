//! Aggregate and domain event traits.

use serde::{Serialize, de::DeserializeOwned};
use store::Entity;

use crate::error::InvariantViolation;

/// A fact that happened to an aggregate, named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone + std::fmt::Debug {
    /// Event name used for routing and log filtering.
    fn event_type(&self) -> &'static str;
}

/// Events recorded by an aggregate but not yet handed to the event log.
///
/// Only the aggregate itself can add to the buffer. Callers drain it with
/// [`take`](Self::take) once the aggregate has been saved. Aggregates hold it
/// in a `#[serde(skip)]` field so it never reaches storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvents<E>(Vec<E>);

impl<E> PendingEvents<E> {
    pub(crate) fn extend(&mut self, events: impl IntoIterator<Item = E>) {
        self.0.extend(events);
    }

    pub fn as_slice(&self) -> &[E] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Removes and returns every buffered event.
    pub fn take(&mut self) -> Vec<E> {
        std::mem::take(&mut self.0)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<E> Default for PendingEvents<E> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

/// An aggregate root: mutated only through its command methods, each of
/// which either succeeds completely or leaves the aggregate untouched.
pub trait Aggregate: Entity + Clone {
    type Event: DomainEvent;

    type Error: std::error::Error + From<InvariantViolation> + Send + Sync + 'static;

    /// Checks every invariant of the current state.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;

    fn pending(&self) -> &PendingEvents<Self::Event>;

    fn pending_mut(&mut self) -> &mut PendingEvents<Self::Event>;

    /// Events recorded since the last drain, oldest first.
    fn pending_events(&self) -> &[Self::Event] {
        self.pending().as_slice()
    }

    /// Drains the buffer. Call after a successful save.
    fn take_pending_events(&mut self) -> Vec<Self::Event> {
        self.pending_mut().take()
    }

    fn clear_pending_events(&mut self) {
        self.pending_mut().clear();
    }
}

/// Runs `change` against a copy of `aggregate` and commits it only if the
/// change succeeds and every invariant still holds.
///
/// On success the returned events are also appended to the pending buffer.
pub(crate) fn transact<A, F>(aggregate: &mut A, change: F) -> Result<Vec<A::Event>, A::Error>
where
    A: Aggregate,
    F: FnOnce(&mut A) -> Result<Vec<A::Event>, A::Error>,
{
    let mut candidate = aggregate.clone();
    let events = change(&mut candidate)?;

    if let Err(violation) = candidate.check_invariants() {
        tracing::error!(
            aggregate_type = A::entity_type(),
            id = %aggregate.id(),
            %violation,
            "command rejected: post-condition failed"
        );
        return Err(violation.into());
    }

    candidate.pending_mut().extend(events.iter().cloned());
    *aggregate = candidate;
    Ok(events)
}
