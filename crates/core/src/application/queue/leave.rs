// Leave Use Case

use crate::domain::{DestinationId, RequesterId};
use crate::error::{AppError, Result};
use crate::port::TransactionalQueueRepository;

/// Remove the requester's membership
///
/// Positions of everyone behind drop by the leaver's party size; no other
/// membership is touched.
pub async fn execute(
    queue_repo: &dyn TransactionalQueueRepository,
    destination: &DestinationId,
    requester: &RequesterId,
) -> Result<()> {
    let mut tx = queue_repo.begin_transaction().await?;

    if !tx.delete_membership(destination, requester).await? {
        tx.rollback().await?;
        return Err(AppError::not_queued(destination, requester));
    }

    tx.commit().await?;
    Ok(())
}
