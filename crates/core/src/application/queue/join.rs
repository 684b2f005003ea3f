// Join Use Case

use crate::domain::{DestinationId, PartySize, QueueMembership, RequesterId};
use crate::error::{AppError, Result};
use crate::port::{TimeProvider, TransactionalQueueRepository};

/// Execute join use case (with transaction for atomicity)
///
/// The sequence number is claimed inside the same transaction as the
/// membership insert, so two concurrent joins can never share one.
///
/// # Arguments
///
/// * `queue_repo` - Transactional queue repository
/// * `time_provider` - Time provider (injected for determinism)
/// * `destination` - Destination to join
/// * `requester` - Joining requester
/// * `party_size` - Validated party size
pub async fn execute(
    queue_repo: &dyn TransactionalQueueRepository,
    time_provider: &dyn TimeProvider,
    destination: &DestinationId,
    requester: &RequesterId,
    party_size: PartySize,
) -> Result<QueueMembership> {
    let mut tx = queue_repo.begin_transaction().await?;

    // First statement is a write so the store takes its write lock up front
    let Some(sequence) = tx.claim_next_sequence(destination).await? else {
        tx.rollback().await?;
        return Err(AppError::UnknownDestination(destination.to_string()));
    };

    if tx.find_membership(destination, requester).await?.is_some() {
        tx.rollback().await?;
        return Err(AppError::already_queued(destination, requester));
    }

    let membership = QueueMembership::new(
        destination.clone(),
        requester.clone(),
        party_size,
        sequence,
        time_provider.now_millis(),
    );
    tx.insert_membership(&membership).await?;

    tx.commit().await?;

    Ok(membership)
}
