//! Shared wiring for the SQLite-backed scenario tests

#![allow(dead_code)]

use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use waitline_core::application::{
    DestinationRegistry, FeedbackService, PositionResolver, QueueService, RetryPolicy,
};
use waitline_core::domain::{ContactInfo, DailyBoundary, Destination, Registration};
use waitline_core::port::time_provider::mocks::ManualTimeProvider;
use waitline_infra_sqlite::{
    create_pool, run_migrations, SqliteDestinationRepository, SqliteFeedbackRepository,
    SqliteQueueRepository, WriteLock,
};

pub const THRESHOLD: u64 = 30;

/// 2024-01-15 12:00:00 UTC (winter, London = UTC)
pub const MONDAY_NOON: i64 = 1_705_320_000_000;

pub struct Harness {
    pub pool: SqlitePool,
    pub clock: Arc<ManualTimeProvider>,
    pub registry: Arc<DestinationRegistry>,
    pub queue: Arc<QueueService>,
    pub resolver: Arc<PositionResolver>,
    pub feedback: Arc<FeedbackService>,
    db_file: Option<PathBuf>,
}

impl Harness {
    /// In-memory database, single connection
    pub async fn memory() -> Self {
        Self::open(":memory:".to_string(), None).await
    }

    /// Fresh database file in the temp directory
    pub async fn file() -> Self {
        let path = temp_db_path();
        Self::open(path.to_string_lossy().into_owned(), Some(path)).await
    }

    /// Reopen an existing database file, as a restarted daemon would
    pub async fn reopen(path: PathBuf) -> Self {
        Self::open(path.to_string_lossy().into_owned(), Some(path)).await
    }

    async fn open(url: String, db_file: Option<PathBuf>) -> Self {
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let write_lock = WriteLock::new();
        let destinations = Arc::new(SqliteDestinationRepository::new(
            pool.clone(),
            write_lock.clone(),
        ));
        let queue_repo = Arc::new(SqliteQueueRepository::new(pool.clone(), write_lock.clone()));
        let feedback_repo = Arc::new(SqliteFeedbackRepository::new(pool.clone(), write_lock));

        let clock = Arc::new(ManualTimeProvider::new(MONDAY_NOON));
        let retry = RetryPolicy::new(5, 2.0, 4);
        let timeout = Duration::from_secs(5);

        let registry = Arc::new(DestinationRegistry::new(
            destinations.clone(),
            clock.clone(),
            DailyBoundary::new(18, "Europe/London").unwrap(),
            retry.clone(),
            timeout,
        ));
        let queue = Arc::new(QueueService::new(
            queue_repo.clone(),
            queue_repo,
            clock.clone(),
            retry.clone(),
            timeout,
        ));
        let resolver = Arc::new(PositionResolver::new(queue.clone(), THRESHOLD));
        let feedback = Arc::new(FeedbackService::new(
            destinations,
            feedback_repo,
            clock.clone(),
            retry,
            timeout,
        ));

        Self {
            pool,
            clock,
            registry,
            queue,
            resolver,
            feedback,
            db_file,
        }
    }

    pub fn db_file(&self) -> Option<PathBuf> {
        self.db_file.clone()
    }

    pub async fn register(&self, name: &str, entry_rate: u32) -> Destination {
        self.registry
            .register(registration(name, entry_rate))
            .await
            .unwrap()
    }

    /// Close the pool and delete the database file
    pub async fn cleanup(self) {
        self.pool.close().await;
        if let Some(path) = self.db_file {
            remove_db(&path);
        }
    }
}

pub fn registration(name: &str, entry_rate: u32) -> Registration {
    Registration {
        name: name.to_string(),
        contact: ContactInfo {
            website: "https://example.com".to_string(),
            phone: "0123456789".to_string(),
        },
        entry_rate,
    }
}

pub fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("waitline-test-{}.db", uuid::Uuid::new_v4()))
}

pub fn remove_db(path: &std::path::Path) {
    for suffix in ["", "-wal", "-shm"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        let _ = std::fs::remove_file(PathBuf::from(name));
    }
}
