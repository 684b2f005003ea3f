// Destination Registry - register, look up, daily day-count reset

use crate::application::retry::{with_timeout, RetryPolicy};
use crate::domain::{DailyBoundary, Destination, DestinationId, Registration};
use crate::error::{AppError, Result};
use crate::port::{DestinationRepository, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct DestinationRegistry {
    repo: Arc<dyn DestinationRepository>,
    time_provider: Arc<dyn TimeProvider>,
    boundary: DailyBoundary,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl DestinationRegistry {
    pub fn new(
        repo: Arc<dyn DestinationRepository>,
        time_provider: Arc<dyn TimeProvider>,
        boundary: DailyBoundary,
        retry: RetryPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            time_provider,
            boundary,
            retry,
            store_timeout,
        }
    }

    pub fn boundary(&self) -> &DailyBoundary {
        &self.boundary
    }

    /// Register a new destination
    ///
    /// Names are unique case-insensitively. A new destination starts with
    /// an empty line and `day_count = 0`.
    pub async fn register(&self, registration: Registration) -> Result<Destination> {
        let destination = Destination::register(registration, self.time_provider.now_millis())?;

        // Storage uniqueness is authoritative; this only gives a clean error early
        if self.get_optional(&destination.id).await?.is_some() {
            return Err(AppError::DuplicateName(destination.display_name));
        }

        with_timeout(
            self.store_timeout,
            "register",
            self.repo.insert(&destination),
        )
        .await?;

        info!(
            destination = %destination.id,
            entry_rate = destination.entry_rate,
            "Destination registered"
        );
        Ok(destination)
    }

    /// Destinations whose name contains `query` (case-insensitive)
    ///
    /// An empty query lists every destination.
    pub async fn find(&self, query: &str) -> Result<Vec<Destination>> {
        self.retry
            .run("find", || {
                with_timeout(self.store_timeout, "find", self.repo.search(query))
            })
            .await
    }

    /// Look up a destination by name
    pub async fn get(&self, name: &str) -> Result<Destination> {
        let id = DestinationId::from_name(name);
        self.get_optional(&id)
            .await?
            .ok_or_else(|| AppError::UnknownDestination(name.trim().to_string()))
    }

    async fn get_optional(&self, id: &DestinationId) -> Result<Option<Destination>> {
        self.retry
            .run_keyed("get_destination", id.as_str(), || {
                with_timeout(self.store_timeout, "get_destination", self.repo.get(id))
            })
            .await
    }

    /// Zero the day-count of every destination not yet reset since the most
    /// recent daily boundary
    ///
    /// Idempotent: a second call before the next boundary resets nothing.
    /// Returns the number of destinations reset.
    pub async fn reset_day_counts_if_past_boundary(&self, now_millis: i64) -> Result<u64> {
        let boundary = self.boundary.most_recent(now_millis);
        let reset = with_timeout(
            self.store_timeout,
            "reset_day_counts",
            self.repo.reset_day_counts(boundary, now_millis),
        )
        .await?;

        if reset > 0 {
            info!(reset, boundary, "Day-counts reset");
        } else {
            debug!(boundary, "No day-counts to reset");
        }
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ContactInfo;
    use crate::port::in_memory::InMemoryStore;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use crate::port::{QueueTransaction, Transaction, TransactionalQueueRepository};
    use chrono::{TimeZone, Utc};

    fn registration(name: &str) -> Registration {
        Registration {
            name: name.to_string(),
            contact: ContactInfo {
                website: "https://example.com".to_string(),
                phone: "0123456789".to_string(),
            },
            entry_rate: 5,
        }
    }

    fn millis(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn setup(now: i64) -> (DestinationRegistry, InMemoryStore, Arc<ManualTimeProvider>) {
        let store = InMemoryStore::new();
        let clock = Arc::new(ManualTimeProvider::new(now));
        let registry = DestinationRegistry::new(
            Arc::new(store.clone()),
            clock.clone(),
            DailyBoundary::new(18, "Europe/London").unwrap(),
            RetryPolicy::new(1, 1.0, 3),
            Duration::from_secs(1),
        );
        (registry, store, clock)
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let (registry, _, _) = setup(millis(2024, 1, 10, 9, 0));

        let dest = registry.register(registration("Cafe Nero")).await.unwrap();
        assert_eq!(dest.id.as_str(), "cafe nero");
        assert_eq!(dest.day_count, 0);

        let found = registry.get("CAFE NERO").await.unwrap();
        assert_eq!(found, dest);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_name_case_insensitively() {
        let (registry, _, _) = setup(0);
        registry.register(registration("Bakery")).await.unwrap();

        let err = registry.register(registration("bakery")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_contact() {
        let (registry, _, _) = setup(0);
        let mut reg = registration("Bakery");
        reg.contact.phone = "12345".to_string();

        let err = registry.register(reg).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
        assert!(registry.find("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_destination() {
        let (registry, _, _) = setup(0);
        let err = registry.get("nowhere").await.unwrap_err();
        assert!(matches!(err, AppError::UnknownDestination(name) if name == "nowhere"));
    }

    #[tokio::test]
    async fn test_find_by_substring() {
        let (registry, _, _) = setup(0);
        for name in ["Pizza Place", "Pizza Hut", "Burger Bar"] {
            registry.register(registration(name)).await.unwrap();
        }

        let names: Vec<String> = registry
            .find("PIZZA")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.display_name)
            .collect();
        assert_eq!(names, vec!["Pizza Hut", "Pizza Place"]);

        assert_eq!(registry.find("").await.unwrap().len(), 3);
        assert!(registry.find("sushi").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_day_counts_once_per_boundary() {
        // Registered at 10:00 London (winter, UTC+0)
        let (registry, store, clock) = setup(millis(2024, 1, 10, 10, 0));
        registry.register(registration("Museum")).await.unwrap();

        // Simulate admissions
        let mut tx = store.begin_transaction().await.unwrap();
        tx.add_to_day_count(&DestinationId::from_name("Museum"), 12)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        // Before 18:00 nothing happens
        clock.set(millis(2024, 1, 10, 17, 59));
        assert_eq!(
            registry
                .reset_day_counts_if_past_boundary(clock.now_millis())
                .await
                .unwrap(),
            0
        );
        assert_eq!(registry.get("museum").await.unwrap().day_count, 12);

        // After 18:00 the count resets, exactly once
        clock.set(millis(2024, 1, 10, 18, 5));
        let now = clock.now_millis();
        assert_eq!(registry.reset_day_counts_if_past_boundary(now).await.unwrap(), 1);
        assert_eq!(registry.reset_day_counts_if_past_boundary(now).await.unwrap(), 0);

        let museum = registry.get("museum").await.unwrap();
        assert_eq!(museum.day_count, 0);
        assert_eq!(museum.last_reset_at, now);
    }
}
