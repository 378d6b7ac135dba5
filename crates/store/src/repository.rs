use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use crate::{AggregateId, Result, StoreError, Version};

/// Anything a [`Repository`] can hold.
///
/// State is persisted through serde, so fields marked `#[serde(skip)]` (such
/// as an aggregate's buffer of unpublished events) never reach storage.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in errors, logs and metric labels.
    fn entity_type() -> &'static str;

    fn id(&self) -> AggregateId;

    /// Version the entity was loaded at, or [`Version::initial`] if it has
    /// never been saved.
    fn version(&self) -> Version;

    /// Called by the repository after a successful save.
    fn set_version(&mut self, version: Version);
}

/// Keyed storage for one entity type.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Returns the stored entity, or `None` if the id is unknown.
    async fn get_by_id(&self, id: AggregateId) -> Result<Option<E>>;

    /// Persists `entity` if the stored version still equals the version it
    /// was loaded at, then advances its version by one.
    ///
    /// Fails with [`StoreError::ConcurrentModification`] otherwise, leaving
    /// both the store and `entity` untouched.
    async fn save(&self, entity: &mut E) -> Result<Version>;

    /// Returns every stored entity accepted by `predicate`.
    async fn find(
        &self,
        predicate: &(dyn for<'e> Fn(&'e E) -> bool + Send + Sync),
    ) -> Result<Vec<E>>;

    /// Like [`get_by_id`](Self::get_by_id) but treats a missing id as an error.
    async fn load(&self, id: AggregateId) -> Result<E> {
        self.get_by_id(id).await?.ok_or(StoreError::NotFound {
            entity_type: E::entity_type(),
            aggregate_id: id,
        })
    }

    async fn find_all(&self) -> Result<Vec<E>> {
        self.find(&|_| true).await
    }
}

struct Stored {
    version: Version,
    state: serde_json::Value,
}

/// In-memory repository.
///
/// One lock covers the whole collection, so saves are serialized across all
/// keys. Entities are kept as JSON snapshots, which means a loaded entity is
/// always a fresh copy and never aliases stored state.
pub struct InMemoryRepository<E> {
    entities: Arc<RwLock<HashMap<AggregateId, Stored>>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            entities: Arc::default(),
            _entity: PhantomData,
        }
    }

    /// Number of stored entities.
    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entities.write().await.clear();
    }
}

impl<E> Clone for InMemoryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
            _entity: PhantomData,
        }
    }
}

impl<E> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn get_by_id(&self, id: AggregateId) -> Result<Option<E>> {
        let entities = self.entities.read().await;
        entities
            .get(&id)
            .map(|stored| serde_json::from_value(stored.state.clone()).map_err(StoreError::from))
            .transpose()
    }

    async fn save(&self, entity: &mut E) -> Result<Version> {
        let id = entity.id();
        let expected = entity.version();

        let mut entities = self.entities.write().await;
        let actual = entities
            .get(&id)
            .map(|stored| stored.version)
            .unwrap_or_default();

        if actual != expected {
            tracing::warn!(
                entity_type = E::entity_type(),
                %id,
                %expected,
                %actual,
                "rejected stale save"
            );
            metrics::counter!("repository_conflicts_total", "entity" => E::entity_type())
                .increment(1);
            return Err(StoreError::ConcurrentModification {
                entity_type: E::entity_type(),
                aggregate_id: id,
                expected,
                actual,
            });
        }

        let next = expected.next();
        entity.set_version(next);
        let state = match serde_json::to_value(&*entity) {
            Ok(state) => state,
            Err(e) => {
                entity.set_version(expected);
                return Err(e.into());
            }
        };
        entities.insert(
            id,
            Stored {
                version: next,
                state,
            },
        );

        tracing::debug!(entity_type = E::entity_type(), %id, version = %next, "saved");
        Ok(next)
    }

    async fn find(
        &self,
        predicate: &(dyn for<'e> Fn(&'e E) -> bool + Send + Sync),
    ) -> Result<Vec<E>> {
        let entities = self.entities.read().await;
        let mut found = Vec::new();
        for stored in entities.values() {
            let entity: E = serde_json::from_value(stored.state.clone())?;
            if predicate(&entity) {
                found.push(entity);
            }
        }
        Ok(found)
    }
}
