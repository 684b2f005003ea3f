// Day-Count Reset Scheduler
// Periodically zeroes per-destination day-counts after the daily boundary

use crate::application::registry::DestinationRegistry;
use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::TimeProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Day-count reset scheduler
///
/// Polls instead of sleeping until the boundary, so clock jumps and DST
/// changes are picked up on the next tick. The reset itself is idempotent.
pub struct DayCountResetScheduler {
    registry: Arc<DestinationRegistry>,
    time_provider: Arc<dyn TimeProvider>,
    check_interval: Duration,
}

impl DayCountResetScheduler {
    pub fn new(
        registry: Arc<DestinationRegistry>,
        time_provider: Arc<dyn TimeProvider>,
        check_interval: Duration,
    ) -> Self {
        Self {
            registry,
            time_provider,
            check_interval,
        }
    }

    /// Run reset loop (background task)
    ///
    /// Should be spawned in tokio::spawn
    pub async fn run(self, mut shutdown: ShutdownToken) {
        let now = self.time_provider.now_millis();
        info!(
            interval_secs = self.check_interval.as_secs(),
            time_zone = %self.registry.boundary().time_zone(),
            next_boundary = self.registry.boundary().next_after(now),
            "Day-count reset scheduler started"
        );

        let mut tick = interval(self.check_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tick.tick() => {
                    if let Err(e) = self.run_now().await {
                        error!(error = %e, "Scheduled day-count reset failed");
                    }
                }
            }
        }

        info!("Day-count reset scheduler stopped");
    }

    /// Run the reset check immediately
    pub async fn run_now(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();
        self.registry.reset_day_counts_if_past_boundary(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::retry::RetryPolicy;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::{ContactInfo, DailyBoundary, Registration};
    use crate::port::in_memory::InMemoryStore;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::{QueueTransaction, Transaction, TransactionalQueueRepository};
    use chrono::{TimeZone, Utc};

    fn millis(mo: u32, d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, mo, d, h, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    async fn setup(
        now: i64,
    ) -> (
        DayCountResetScheduler,
        Arc<DestinationRegistry>,
        Arc<ManualTimeProvider>,
        InMemoryStore,
    ) {
        let store = InMemoryStore::new();
        let clock = Arc::new(ManualTimeProvider::new(now));
        let registry = Arc::new(DestinationRegistry::new(
            Arc::new(store.clone()),
            clock.clone(),
            DailyBoundary::new(18, "Europe/London").unwrap(),
            RetryPolicy::no_retry(),
            Duration::from_secs(1),
        ));
        registry
            .register(Registration {
                name: "Zoo".to_string(),
                contact: ContactInfo {
                    website: "https://zoo.example".to_string(),
                    phone: "0123456789".to_string(),
                },
                entry_rate: 4,
            })
            .await
            .unwrap();

        let scheduler =
            DayCountResetScheduler::new(registry.clone(), clock.clone(), Duration::from_millis(10));
        (scheduler, registry, clock, store)
    }

    async fn admit(store: &InMemoryStore, people: u64) {
        let mut tx = store.begin_transaction().await.unwrap();
        tx.add_to_day_count(&crate::domain::DestinationId::from_name("zoo"), people)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_now_respects_summer_time_boundary() {
        // 18:00 London in July is 17:00 UTC
        let (scheduler, registry, clock, store) = setup(millis(7, 1, 9)).await;
        admit(&store, 9).await;

        clock.set(millis(7, 1, 16) + 59 * 60_000);
        assert_eq!(scheduler.run_now().await.unwrap(), 0);

        clock.set(millis(7, 1, 17));
        assert_eq!(scheduler.run_now().await.unwrap(), 1);
        assert_eq!(registry.get("zoo").await.unwrap().day_count, 0);

        // Counts accumulate again until the next day's boundary
        admit(&store, 3).await;
        clock.set(millis(7, 2, 16));
        assert_eq!(scheduler.run_now().await.unwrap(), 0);
        assert_eq!(registry.get("zoo").await.unwrap().day_count, 3);

        clock.set(millis(7, 2, 17));
        assert_eq!(scheduler.run_now().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_loop_resets_and_stops_on_shutdown() {
        let (scheduler, registry, clock, store) = setup(millis(1, 10, 9)).await;
        admit(&store, 5).await;
        clock.set(millis(1, 10, 19));

        let (shutdown_tx, shutdown) = shutdown_channel();
        let handle = tokio::spawn(scheduler.run(shutdown));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while registry.get("zoo").await.unwrap().day_count != 0
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.get("zoo").await.unwrap().day_count, 0);

        shutdown_tx.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
