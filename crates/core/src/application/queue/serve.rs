// Serve Use Case - admit the head of the line

use crate::domain::{DestinationId, QueueMembership};
use crate::error::{AppError, Result};
use crate::port::TransactionalQueueRepository;
use serde::{Deserialize, Serialize};

/// Result of admitting one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeOutcome {
    pub destination: DestinationId,
    pub admitted: Vec<QueueMembership>,
    pub people_admitted: u64,
    /// Day-count after this batch
    pub day_count: u64,
}

/// Pick the parties admitted in one batch
///
/// Takes parties from the head while the running total of people stays
/// within `entry_rate`. The head party is always admitted, even if it is
/// larger than the rate, so an oversized party cannot block the line.
/// `members` must be ordered by sequence.
pub fn select_batch(members: &[QueueMembership], entry_rate: u32) -> Vec<QueueMembership> {
    let limit = u64::from(entry_rate);
    let mut people = 0u64;
    let mut batch = Vec::new();

    for member in members {
        if !batch.is_empty() && people + member.people() > limit {
            break;
        }
        people += member.people();
        batch.push(member.clone());
    }
    batch
}

pub async fn execute(
    queue_repo: &dyn TransactionalQueueRepository,
    destination: &DestinationId,
) -> Result<ServeOutcome> {
    let mut tx = queue_repo.begin_transaction().await?;

    let Some(record) = tx.get_destination(destination).await? else {
        tx.rollback().await?;
        return Err(AppError::UnknownDestination(destination.to_string()));
    };

    let members = tx.memberships(destination).await?;
    let admitted = select_batch(&members, record.entry_rate);

    for member in &admitted {
        tx.delete_membership(destination, &member.requester).await?;
    }

    let people_admitted: u64 = admitted.iter().map(QueueMembership::people).sum();
    if people_admitted > 0 {
        tx.add_to_day_count(destination, people_admitted).await?;
    }

    tx.commit().await?;

    Ok(ServeOutcome {
        destination: destination.clone(),
        admitted,
        people_admitted,
        day_count: record.day_count + people_admitted,
    })
}
