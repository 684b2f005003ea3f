// Position Resolver - people-based place in line
//
// position = sum of party sizes of every membership with sequence <= own.
// A requester is counted in their own position, so the head party of
// size 4 is at position 4.

use crate::application::queue::QueueService;
use crate::domain::{DestinationId, PartySize, QueueMembership, RequesterId, SequenceNumber};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Position of `requester` in `snapshot`, None if not queued
pub fn position_of(snapshot: &[QueueMembership], requester: &RequesterId) -> Option<u64> {
    let own = snapshot.iter().find(|m| &m.requester == requester)?;
    Some(
        snapshot
            .iter()
            .filter(|m| m.sequence <= own.sequence)
            .map(QueueMembership::people)
            .sum(),
    )
}

/// Total people waiting
pub fn total_waiting(snapshot: &[QueueMembership]) -> u64 {
    snapshot.iter().map(QueueMembership::people).sum()
}

/// Whether a position is close enough to the front to alert
pub fn should_notify(position: u64, threshold: u64) -> bool {
    position <= threshold
}

/// Every membership with its position, for a snapshot ordered by sequence
pub fn positions(snapshot: &[QueueMembership]) -> impl Iterator<Item = (&QueueMembership, u64)> {
    snapshot.iter().scan(0u64, |running, member| {
        *running += member.people();
        Some((member, *running))
    })
}

/// A requester's view of a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub destination: DestinationId,
    pub requester: RequesterId,
    pub sequence: SequenceNumber,
    pub party_size: PartySize,
    pub position: u64,
    pub people_ahead: u64,
    pub total_waiting: u64,
    pub parties_waiting: usize,
    pub near_front: bool,
}

impl QueueStatus {
    pub fn from_snapshot(
        snapshot: &[QueueMembership],
        requester: &RequesterId,
        notify_threshold: u64,
    ) -> Option<Self> {
        let own = snapshot.iter().find(|m| &m.requester == requester)?;
        let position = position_of(snapshot, requester)?;
        Some(Self {
            destination: own.destination.clone(),
            requester: requester.clone(),
            sequence: own.sequence,
            party_size: own.party_size,
            position,
            people_ahead: position - own.people(),
            total_waiting: total_waiting(snapshot),
            parties_waiting: snapshot.len(),
            near_front: should_notify(position, notify_threshold),
        })
    }
}

/// Derives positions from consistent queue snapshots
pub struct PositionResolver {
    queue: Arc<QueueService>,
    notify_threshold: u64,
}

impl PositionResolver {
    pub fn new(queue: Arc<QueueService>, notify_threshold: u64) -> Self {
        Self {
            queue,
            notify_threshold,
        }
    }

    pub fn notify_threshold(&self) -> u64 {
        self.notify_threshold
    }

    pub fn should_notify(&self, position: u64) -> bool {
        should_notify(position, self.notify_threshold)
    }

    pub async fn snapshot(&self, destination: &DestinationId) -> Result<Vec<QueueMembership>> {
        self.queue.snapshot(destination).await
    }

    pub async fn active_destinations(&self) -> Result<Vec<DestinationId>> {
        self.queue.active_destinations().await
    }

    pub async fn position_of(
        &self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<u64> {
        let snapshot = self.queue.snapshot(destination).await?;
        position_of(&snapshot, requester)
            .ok_or_else(|| AppError::not_queued(destination, requester))
    }

    pub async fn total_waiting(&self, destination: &DestinationId) -> Result<u64> {
        let snapshot = self.queue.snapshot(destination).await?;
        Ok(total_waiting(&snapshot))
    }

    /// Position, totals and alert flag from a single snapshot
    pub async fn status(
        &self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<QueueStatus> {
        let snapshot = self.queue.snapshot(destination).await?;
        QueueStatus::from_snapshot(&snapshot, requester, self.notify_threshold)
            .ok_or_else(|| AppError::not_queued(destination, requester))
    }
}
