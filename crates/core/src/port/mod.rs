// Port Layer - Interfaces for external dependencies

pub mod destination_repository;
pub mod feedback_repository;
pub mod id_provider; // For deterministic testing
pub mod identity_cache;
pub mod in_memory;
pub mod notifier;
pub mod queue_repository;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use destination_repository::DestinationRepository;
pub use feedback_repository::FeedbackRepository;
pub use id_provider::IdProvider;
pub use identity_cache::IdentityCache;
pub use notifier::{Notification, Notifier};
pub use queue_repository::QueueRepository;
pub use time_provider::TimeProvider;
pub use transaction::{QueueTransaction, Transaction, TransactionalQueueRepository};
