// Waitline Infrastructure - SQLite Adapter
// Implements: DestinationRepository, QueueRepository, TransactionalQueueRepository, FeedbackRepository

mod connection;
mod destination_repository;
mod error;
mod feedback_repository;
mod migration;
mod queue_repository;
mod transaction;

pub use connection::{create_pool, WriteLock};
pub use destination_repository::SqliteDestinationRepository;
pub use feedback_repository::SqliteFeedbackRepository;
pub use migration::{current_version, run_migrations};
pub use queue_repository::SqliteQueueRepository;
pub use transaction::SqliteQueueTransaction;
