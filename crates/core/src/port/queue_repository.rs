// Queue Repository Port (read side)

use crate::domain::{DestinationId, QueueMembership};
use crate::error::Result;
use async_trait::async_trait;

/// Read-only access to queue memberships
///
/// Mutations go through `TransactionalQueueRepository`.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Consistent snapshot of a destination's line, ordered by sequence ascending
    async fn snapshot(&self, destination: &DestinationId) -> Result<Vec<QueueMembership>>;

    /// Destinations with at least one active membership
    async fn active_destinations(&self) -> Result<Vec<DestinationId>>;
}
