// Transaction port for atomic queue mutations

use crate::domain::{Destination, DestinationId, QueueMembership, RequesterId, SequenceNumber};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Transactional queue operations
///
/// Write transactions against one store are serialised; dropping an
/// uncommitted transaction discards its changes.
#[async_trait]
pub trait TransactionalQueueRepository: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>>;
}

/// Queue operations within a transaction
#[async_trait]
pub trait QueueTransaction: Transaction {
    /// Get destination (within transaction)
    async fn get_destination(&mut self, id: &DestinationId) -> Result<Option<Destination>>;

    /// Reserve the next sequence number for a destination
    ///
    /// Returns None if the destination does not exist. Numbers are never
    /// handed out twice, even after the holder leaves.
    async fn claim_next_sequence(&mut self, id: &DestinationId) -> Result<Option<SequenceNumber>>;

    /// Find the active membership of a requester (within transaction)
    async fn find_membership(
        &mut self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<Option<QueueMembership>>;

    /// Insert membership (within transaction)
    async fn insert_membership(&mut self, membership: &QueueMembership) -> Result<()>;

    /// Delete membership, returns false if none was active
    async fn delete_membership(
        &mut self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<bool>;

    /// All memberships of a destination ordered by sequence (within transaction)
    async fn memberships(&mut self, destination: &DestinationId) -> Result<Vec<QueueMembership>>;

    /// Increase the served-customers day-count
    async fn add_to_day_count(&mut self, destination: &DestinationId, people: u64) -> Result<()>;
}
