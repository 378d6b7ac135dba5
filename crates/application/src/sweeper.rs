//! Periodic release of expired stock reservations.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::{ErrorKind, InventoryEvent, InventoryItem};
use store::Entity;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::handler::CommandHandler;

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Items that had at least one reservation released.
    pub items_swept: usize,
    pub reservations_expired: usize,
    /// Items changed by someone else mid-sweep; the next sweep retries them.
    pub conflicts: usize,
    pub failures: usize,
}

/// Releases reservations whose expiry has passed, one item at a time.
///
/// A failure on one item is logged and does not stop the sweep.
pub struct ReservationSweeper {
    handler: CommandHandler<InventoryItem>,
}

impl ReservationSweeper {
    pub fn new(handler: CommandHandler<InventoryItem>) -> Self {
        Self { handler }
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweeps as if the current time were `now`.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let due = self
            .handler
            .repository()
            .find(&move |item: &InventoryItem| item.has_expired_reservations_at(now))
            .await?;

        let mut report = SweepReport::default();
        for item in due {
            let item_id = item.id();
            let outcome = self
                .handler
                .execute(item_id, "expire_reservations", |item| {
                    item.expire_reservations_at(now)
                })
                .await;
            match outcome {
                Ok(result) => {
                    let released = result
                        .events
                        .iter()
                        .filter(|e| matches!(e, InventoryEvent::StockReleased(_)))
                        .count();
                    report.items_swept += 1;
                    report.reservations_expired += released;
                }
                Err(e) if e.kind() == ErrorKind::ConcurrentModification => {
                    tracing::debug!(%item_id, "item changed during sweep, retrying next tick");
                    report.conflicts += 1;
                }
                Err(e) => {
                    tracing::error!(%item_id, error = %e, "failed to expire reservations");
                    report.failures += 1;
                }
            }
        }

        metrics::counter!("reservations_expired_total")
            .increment(report.reservations_expired as u64);
        Ok(report)
    }

    /// Sweeps every `period` until `shutdown` resolves.
    pub async fn run(&self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("reservation sweeper stopping");
                    break;
                }
                _ = ticker.tick() => match self.sweep().await {
                    Ok(report) if report.reservations_expired > 0 => {
                        tracing::info!(
                            items = report.items_swept,
                            expired = report.reservations_expired,
                            "released expired reservations"
                        );
                    }
                    Ok(_) => tracing::debug!("no expired reservations"),
                    Err(e) => tracing::error!(error = %e, "reservation sweep failed"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration as ChronoDuration;
    use domain::inventory::ReservationId;
    use store::{EventLog, InMemoryEventLog, InMemoryRepository};

    use super::*;

    async fn item_with_reservations(
        handler: &CommandHandler<InventoryItem>,
    ) -> (store::AggregateId, DateTime<Utc>) {
        let id = handler
            .create("register_item", || InventoryItem::new("SKU-1", 20, 0, 0))
            .await
            .unwrap()
            .aggregate
            .id();
        let soon = Utc::now() + ChronoDuration::hours(1);
        let later = Utc::now() + ChronoDuration::hours(48);
        handler
            .execute(id, "reserve_stock", |item| {
                item.reserve(ReservationId::new(), 3, "order A", Some(soon))?;
                item.reserve(ReservationId::new(), 4, "order B", Some(later))
            })
            .await
            .unwrap();
        (id, soon)
    }

    fn handler(log: Arc<InMemoryEventLog>) -> CommandHandler<InventoryItem> {
        CommandHandler::new(Arc::new(InMemoryRepository::<InventoryItem>::new()), log)
    }

    #[tokio::test]
    async fn releases_only_due_reservations() {
        let log = Arc::new(InMemoryEventLog::new());
        let handler = handler(log.clone());
        let (id, soon) = item_with_reservations(&handler).await;
        let sweeper = ReservationSweeper::new(handler.clone());

        let report = sweeper
            .sweep_at(soon + ChronoDuration::minutes(1))
            .await
            .unwrap();

        assert_eq!(report.items_swept, 1);
        assert_eq!(report.reservations_expired, 1);
        let item = handler.load(id).await.unwrap();
        assert_eq!(item.reserved_quantity(), 4);
        assert_eq!(item.available_quantity(), 16);

        let released = log.events_by_type("StockReleased").await.unwrap();
        assert_eq!(released.len(), 1);
    }

    #[tokio::test]
    async fn nothing_due_is_a_no_op() {
        let log = Arc::new(InMemoryEventLog::new());
        let handler = handler(log.clone());
        let (id, _) = item_with_reservations(&handler).await;
        let sweeper = ReservationSweeper::new(handler.clone());

        let report = sweeper.sweep().await.unwrap();

        assert_eq!(report, SweepReport::default());
        assert_eq!(handler.load(id).await.unwrap().reserved_quantity(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_shutdown() {
        let handler = handler(Arc::new(InMemoryEventLog::new()));
        let sweeper = ReservationSweeper::new(handler);

        sweeper
            .run(
                Duration::from_secs(60),
                tokio::time::sleep(Duration::from_secs(150)),
            )
            .await;
    }
}
