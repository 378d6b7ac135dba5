use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{AggregateId, EventEnvelope, EventQuery, Result};

/// Append-only sink for published domain events.
///
/// Events reach the log only after the aggregate that emitted them was
/// saved. Delivery to downstream consumers is not this layer's concern.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Appends a batch, preserving its order.
    async fn publish(&self, events: Vec<EventEnvelope>) -> Result<()>;

    /// Returns matching events in publication order.
    async fn query(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    async fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        self.query(EventQuery::for_aggregate(aggregate_id)).await
    }

    async fn events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        self.query(EventQuery::for_event_type(event_type)).await
    }
}

/// In-memory event log.
#[derive(Clone, Default)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of published events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Event types in publication order.
    pub async fn event_types(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn publish(&self, events: Vec<EventEnvelope>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let count = events.len();
        self.events.write().await.extend(events);
        metrics::counter!("events_published_total").increment(count as u64);
        Ok(())
    }

    async fn query(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let events = self.events.read().await;
        let matching = events.iter().filter(|e| query.matches(e)).cloned();
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}
