use chrono::{DateTime, Utc};

use crate::{AggregateId, EventEnvelope};

/// Filter over published events.
///
/// Every set criterion must match; unset criteria match anything.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub aggregate_id: Option<AggregateId>,
    pub aggregate_type: Option<String>,
    /// Matches any of the listed event types.
    pub event_types: Option<Vec<String>>,
    /// Inclusive lower bound on `occurred_at`.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_aggregate(aggregate_id: AggregateId) -> Self {
        Self::new().aggregate_id(aggregate_id)
    }

    pub fn for_event_type(event_type: impl Into<String>) -> Self {
        Self::new().event_type(event_type)
    }

    pub fn aggregate_id(mut self, id: AggregateId) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types
            .get_or_insert_with(Vec::new)
            .push(event_type.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `envelope` satisfies every criterion except `limit`.
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        if self
            .aggregate_id
            .is_some_and(|id| id != envelope.aggregate_id)
        {
            return false;
        }
        if self
            .aggregate_type
            .as_deref()
            .is_some_and(|t| t != envelope.aggregate_type)
        {
            return false;
        }
        if let Some(types) = &self.event_types
            && !types.iter().any(|t| *t == envelope.event_type)
        {
            return false;
        }
        if self.since.is_some_and(|since| envelope.occurred_at < since) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Version;

    fn envelope(aggregate_id: AggregateId, aggregate_type: &str, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(aggregate_type)
            .event_type(event_type)
            .version(Version::first())
            .payload_raw(serde_json::json!({}))
            .build()
            .unwrap()
    }

    #[test]
    fn empty_query_matches_everything() {
        let e = envelope(AggregateId::new(), "Order", "OrderPlaced");
        assert!(EventQuery::new().matches(&e));
    }

    #[test]
    fn event_types_are_alternatives() {
        let id = AggregateId::new();
        let query = EventQuery::for_event_type("StockReserved").event_type("StockReleased");

        assert!(query.matches(&envelope(id, "InventoryItem", "StockReserved")));
        assert!(query.matches(&envelope(id, "InventoryItem", "StockReleased")));
        assert!(!query.matches(&envelope(id, "InventoryItem", "StockCommitted")));
    }

    #[test]
    fn criteria_are_conjunctive() {
        let id = AggregateId::new();
        let query = EventQuery::for_aggregate(id).aggregate_type("Payment");

        assert!(query.matches(&envelope(id, "Payment", "PaymentCreated")));
        assert!(!query.matches(&envelope(id, "Refund", "RefundInitiated")));
        assert!(!query.matches(&envelope(AggregateId::new(), "Payment", "PaymentCreated")));
    }

    #[test]
    fn since_excludes_older_events() {
        let e = envelope(AggregateId::new(), "Order", "OrderPlaced");
        let later = e.occurred_at + chrono::Duration::seconds(1);
        assert!(!EventQuery::new().since(later).matches(&e));
        assert!(EventQuery::new().since(e.occurred_at).matches(&e));
    }
}
