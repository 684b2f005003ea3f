// Destination Repository Port (Interface)

use crate::domain::{Destination, DestinationId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Destination records
#[async_trait]
pub trait DestinationRepository: Send + Sync {
    /// Insert a new destination
    ///
    /// # Errors
    /// - AppError::DuplicateName if the canonical id already exists
    async fn insert(&self, destination: &Destination) -> Result<()>;

    /// Find destination by canonical id
    async fn get(&self, id: &DestinationId) -> Result<Option<Destination>>;

    /// Case-insensitive substring search over canonical ids, ordered by id
    ///
    /// An empty query lists every destination.
    async fn search(&self, query: &str) -> Result<Vec<Destination>>;

    /// Zero the day-count of every destination last reset before `boundary_millis`
    ///
    /// # Returns
    /// Number of destinations reset
    async fn reset_day_counts(&self, boundary_millis: i64, now_millis: i64) -> Result<u64>;
}
