//! Concurrency behaviour of the in-memory repository under contention.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use store::{
    AggregateId, Entity, EventEnvelope, EventLog, InMemoryEventLog, InMemoryRepository, Repository,
    StoreError, Version,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Counter {
    id: AggregateId,
    version: Version,
    hits: u32,
}

impl Entity for Counter {
    fn entity_type() -> &'static str {
        "Counter"
    }

    fn id(&self) -> AggregateId {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }
}

async fn seeded() -> (InMemoryRepository<Counter>, AggregateId) {
    let repo = InMemoryRepository::new();
    let mut counter = Counter {
        id: AggregateId::new(),
        version: Version::initial(),
        hits: 0,
    };
    repo.save(&mut counter).await.unwrap();
    (repo, counter.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_writers_from_same_version_have_one_winner() {
    let (repo, id) = seeded().await;
    let snapshot = repo.load(id).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let mut copy = snapshot.clone();
        handles.push(tokio::spawn(async move {
            copy.hits += 1;
            repo.save(&mut copy).await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(StoreError::ConcurrentModification { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(conflicts, 7);
    let stored = repo.load(id).await.unwrap();
    assert_eq!(stored.hits, 1);
    assert_eq!(stored.version, Version::new(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reload_and_retry_loses_no_updates() {
    let (repo, id) = seeded().await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let mut counter = repo.load(id).await.unwrap();
                counter.hits += 1;
                match repo.save(&mut counter).await {
                    Ok(_) => break,
                    Err(e) if e.is_conflict() => continue,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = repo.load(id).await.unwrap();
    assert_eq!(stored.hits, 10);
    assert_eq!(stored.version, Version::new(11));
}

#[tokio::test]
async fn shared_log_sees_events_from_all_clones() {
    let log = Arc::new(InMemoryEventLog::new());
    let other = Arc::clone(&log);
    let id = AggregateId::new();

    let envelope = EventEnvelope::builder()
        .aggregate_id(id)
        .aggregate_type("Counter")
        .event_type("CounterHit")
        .version(Version::first())
        .payload_raw(serde_json::json!({"hits": 1}))
        .build()
        .unwrap();
    other.publish(vec![envelope]).await.unwrap();

    let events = log.events_for_aggregate(id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload["hits"], 1);
}
