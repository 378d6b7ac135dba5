//! Command handling infrastructure.

use std::sync::Arc;
use std::time::Instant;

use common::AggregateId;
use domain::{Aggregate, DomainError, DomainEvent};
use store::{EventEnvelope, EventLog, Repository, StoreError, Version};

use crate::error::{ApplicationError, Result};

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate as saved.
    pub aggregate: A,

    /// The events the command produced, in the order they were published.
    pub events: Vec<A::Event>,

    /// The version the save produced.
    pub new_version: Version,
}

/// Runs commands against one aggregate type.
///
/// The handler is responsible for:
/// 1. Loading the aggregate from its repository
/// 2. Running the command, which records events on the aggregate
/// 3. Saving the aggregate with an optimistic version check
/// 4. Publishing the recorded events, numbered with the new version
///
/// Events stay buffered on the aggregate until both the save and the
/// publish succeed. When the publish fails after a successful save, only
/// [`commit`](Self::commit) hands the events back to the caller, still
/// buffered on its aggregate. [`execute`](Self::execute) and
/// [`create`](Self::create) drop their aggregate, so those events are lost;
/// the failure is logged at error level with the event count.
pub struct CommandHandler<A: Aggregate> {
    repository: Arc<dyn Repository<A>>,
    events: Arc<dyn EventLog>,
}

impl<A: Aggregate> Clone for CommandHandler<A> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            events: Arc::clone(&self.events),
        }
    }
}

impl<A> CommandHandler<A>
where
    A: Aggregate,
    DomainError: From<A::Error>,
{
    pub fn new(repository: Arc<dyn Repository<A>>, events: Arc<dyn EventLog>) -> Self {
        Self { repository, events }
    }

    pub fn repository(&self) -> &dyn Repository<A> {
        self.repository.as_ref()
    }

    /// Returns the aggregate, or `None` if the id is unknown.
    pub async fn get(&self, id: AggregateId) -> Result<Option<A>> {
        Ok(self.repository.get_by_id(id).await?)
    }

    /// Like [`get`](Self::get) but a missing id is an error.
    pub async fn load(&self, id: AggregateId) -> Result<A> {
        Ok(self.repository.load(id).await?)
    }

    /// Builds a new aggregate with `factory` and persists it.
    pub async fn create<F>(&self, command: &'static str, factory: F) -> Result<CommandResult<A>>
    where
        F: FnOnce() -> std::result::Result<A, A::Error>,
    {
        let started = Instant::now();
        let result = match factory() {
            Ok(aggregate) => self.persist_owned(command, aggregate).await,
            Err(e) => Err(DomainError::from(e).into()),
        };
        self.record(command, started, result)
    }

    /// Loads the aggregate, runs `command_fn` on it and persists the result.
    ///
    /// A rejected command leaves the stored aggregate untouched.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command: &'static str,
        command_fn: F,
    ) -> Result<CommandResult<A>>
    where
        F: FnOnce(&mut A) -> std::result::Result<Vec<A::Event>, A::Error> + Send,
    {
        let started = Instant::now();
        let result = self.try_execute(aggregate_id, command, command_fn).await;
        self.record(command, started, result)
    }

    /// Persists an aggregate the caller mutated itself, for flows that need
    /// to await between commands.
    pub async fn commit(&self, command: &'static str, aggregate: &mut A) -> Result<Vec<A::Event>> {
        let started = Instant::now();
        let result = self.persist(command, aggregate).await;
        self.record(command, started, result)
    }

    /// Records a command that failed before reaching [`commit`](Self::commit).
    pub fn reject(&self, command: &'static str, error: ApplicationError) -> ApplicationError {
        self.rejected(command, error)
    }

    async fn try_execute<F>(
        &self,
        aggregate_id: AggregateId,
        command: &'static str,
        command_fn: F,
    ) -> Result<CommandResult<A>>
    where
        F: FnOnce(&mut A) -> std::result::Result<Vec<A::Event>, A::Error> + Send,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        command_fn(&mut aggregate).map_err(DomainError::from)?;
        self.persist_owned(command, aggregate).await
    }

    async fn persist_owned(
        &self,
        command: &'static str,
        mut aggregate: A,
    ) -> Result<CommandResult<A>> {
        let events = self.persist(command, &mut aggregate).await?;
        Ok(CommandResult {
            new_version: aggregate.version(),
            aggregate,
            events,
        })
    }

    async fn persist(&self, command: &'static str, aggregate: &mut A) -> Result<Vec<A::Event>> {
        let new_version = self.repository.save(aggregate).await?;
        let envelopes = envelopes(aggregate, new_version, command)?;
        let count = envelopes.len();
        if let Err(e) = self.events.publish(envelopes).await {
            tracing::error!(
                aggregate = A::entity_type(),
                aggregate_id = %aggregate.id(),
                version = %new_version,
                events = count,
                error = %e,
                "aggregate saved but its events were not published"
            );
            return Err(e.into());
        }
        Ok(aggregate.take_pending_events())
    }

    fn record<T>(&self, command: &'static str, started: Instant, result: Result<T>) -> Result<T> {
        metrics::histogram!("command_duration_seconds", "aggregate" => A::entity_type())
            .record(started.elapsed().as_secs_f64());
        match result {
            Ok(value) => {
                metrics::counter!(
                    "commands_executed_total",
                    "aggregate" => A::entity_type(),
                    "command" => command
                )
                .increment(1);
                tracing::info!(aggregate = A::entity_type(), command, "command executed");
                Ok(value)
            }
            Err(e) => Err(self.rejected(command, e)),
        }
    }

    fn rejected(&self, command: &'static str, error: ApplicationError) -> ApplicationError {
        let kind = error.kind();
        metrics::counter!("commands_rejected_total", "kind" => kind.as_str()).increment(1);
        if kind.is_fatal() {
            tracing::error!(
                aggregate = A::entity_type(),
                command,
                error = %error,
                "invariant violated"
            );
        } else {
            tracing::warn!(
                aggregate = A::entity_type(),
                command,
                %kind,
                error = %error,
                "command rejected"
            );
        }
        error
    }
}

/// Wraps the aggregate's buffered events for the log. Every event of one
/// save carries the version that save produced and the command that caused it.
fn envelopes<A: Aggregate>(
    aggregate: &A,
    version: Version,
    command: &str,
) -> Result<Vec<EventEnvelope>> {
    aggregate
        .pending_events()
        .iter()
        .enumerate()
        .map(|(sequence, event)| {
            EventEnvelope::builder()
                .aggregate_id(aggregate.id())
                .aggregate_type(A::entity_type())
                .event_type(event.event_type())
                .version(version)
                .sequence(sequence as u32)
                .metadata("command", serde_json::Value::from(command))
                .payload(event)
                .map_err(StoreError::from)?
                .build()
                .map_err(ApplicationError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use domain::inventory::ReservationId;
    use domain::{ErrorKind, InventoryItem};
    use store::{Entity, InMemoryEventLog, InMemoryRepository};

    use super::*;

    fn handler() -> (CommandHandler<InventoryItem>, Arc<InMemoryEventLog>) {
        let log = Arc::new(InMemoryEventLog::new());
        let repository = Arc::new(InMemoryRepository::<InventoryItem>::new());
        let handler = CommandHandler::new(repository, log.clone());
        (handler, log)
    }

    #[tokio::test]
    async fn execute_saves_and_publishes() {
        let (handler, log) = handler();
        let created = handler
            .create("register_item", || InventoryItem::new("SKU-1", 10, 2, 4))
            .await
            .unwrap();
        assert_eq!(created.new_version, Version::first());

        let result = handler
            .execute(created.aggregate.id(), "reserve_stock", |item| {
                item.reserve(ReservationId::new(), 3, "order", None)
            })
            .await
            .unwrap();

        assert_eq!(result.new_version, Version::new(2));
        assert_eq!(result.events.len(), 1);
        assert!(result.aggregate.pending_events().is_empty());

        let published = log.events_for_aggregate(created.aggregate.id()).await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, "StockReserved");
        assert_eq!(published[0].aggregate_type, "InventoryItem");
        assert_eq!(published[0].version, Version::new(2));
    }

    #[tokio::test]
    async fn rejected_command_changes_nothing() {
        let (handler, log) = handler();
        let id = handler
            .create("register_item", || InventoryItem::new("SKU-1", 2, 0, 0))
            .await
            .unwrap()
            .aggregate
            .id();

        let err = handler
            .execute(id, "reserve_stock", |item| {
                item.reserve(ReservationId::new(), 5, "order", None)
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        let stored = handler.load(id).await.unwrap();
        assert_eq!(stored.version(), Version::first());
        assert_eq!(stored.reserved_quantity(), 0);
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn stale_commit_keeps_events_buffered() {
        let (handler, log) = handler();
        let id = handler
            .create("register_item", || InventoryItem::new("SKU-1", 10, 0, 0))
            .await
            .unwrap()
            .aggregate
            .id();

        let mut first = handler.load(id).await.unwrap();
        let mut second = handler.load(id).await.unwrap();
        first.reserve(ReservationId::new(), 1, "a", None).unwrap();
        second.reserve(ReservationId::new(), 1, "b", None).unwrap();

        handler.commit("reserve_stock", &mut first).await.unwrap();
        let err = handler.commit("reserve_stock", &mut second).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConcurrentModification);
        assert_eq!(second.pending_events().len(), 1);
        assert_eq!(log.len().await, 1);
    }

    struct UnavailableLog;

    #[async_trait::async_trait]
    impl EventLog for UnavailableLog {
        async fn publish(&self, _events: Vec<EventEnvelope>) -> store::Result<()> {
            Err(StoreError::IncompleteEnvelope("payload"))
        }

        async fn query(&self, _query: store::EventQuery) -> store::Result<Vec<EventEnvelope>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failed_publish_after_save_leaves_events_with_the_caller() {
        let repository = Arc::new(InMemoryRepository::<InventoryItem>::new());
        let handler = CommandHandler::new(repository, Arc::new(UnavailableLog));

        let mut item = InventoryItem::new("SKU-1", 10, 0, 0).unwrap();
        item.reserve(ReservationId::new(), 2, "order", None).unwrap();
        let err = handler.commit("reserve_stock", &mut item).await.unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::Store(StoreError::IncompleteEnvelope(_)))
        ));
        assert_eq!(item.pending_events().len(), 1);
        let stored = handler.load(item.id()).await.unwrap();
        assert_eq!(stored.version(), Version::first());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let (handler, _) = handler();
        let err = handler
            .execute(AggregateId::new(), "increase_stock", |item| {
                item.increase_stock(1, "restock")
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
