// Queue Store Service - membership mutations and snapshots

pub mod join;
pub mod leave;
pub mod serve;

#[cfg(test)]
mod queue_test;

pub use serve::ServeOutcome;

use crate::application::constants::QUEUE_EVENT_CHANNEL_CAPACITY;
use crate::application::retry::{with_timeout, RetryPolicy};
use crate::domain::{DestinationId, PartySize, QueueEvent, QueueMembership, RequesterId};
use crate::error::Result;
use crate::port::{QueueRepository, TimeProvider, TransactionalQueueRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

/// One async lock per destination
///
/// Keeps mutations on the same destination in this process strictly
/// ordered while different destinations proceed in parallel. Cross-process
/// exclusion comes from the store transaction. An entry lives only while
/// some caller holds or waits on it.
#[derive(Default)]
struct DestinationLocks {
    locks: Mutex<HashMap<DestinationId, Arc<AsyncMutex<()>>>>,
}

impl DestinationLocks {
    async fn acquire(&self, destination: &DestinationId) -> DestinationGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(destination.clone()).or_default())
        };
        DestinationGuard {
            locks: self,
            destination: destination.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn release(&self, destination: &DestinationId) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map itself still references the lock
        if locks
            .get(destination)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(destination);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct DestinationGuard<'a> {
    locks: &'a DestinationLocks,
    destination: DestinationId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DestinationGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.destination);
    }
}

/// Queue Store Service
///
/// Writes are never retried: a transient failure is surfaced so the
/// caller can decide. Snapshot reads retry with backoff.
pub struct QueueService {
    tx_repo: Arc<dyn TransactionalQueueRepository>,
    queue_repo: Arc<dyn QueueRepository>,
    time_provider: Arc<dyn TimeProvider>,
    locks: DestinationLocks,
    events: broadcast::Sender<QueueEvent>,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl QueueService {
    pub fn new(
        tx_repo: Arc<dyn TransactionalQueueRepository>,
        queue_repo: Arc<dyn QueueRepository>,
        time_provider: Arc<dyn TimeProvider>,
        retry: RetryPolicy,
        store_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(QUEUE_EVENT_CHANNEL_CAPACITY);
        Self {
            tx_repo,
            queue_repo,
            time_provider,
            locks: DestinationLocks::default(),
            events,
            retry,
            store_timeout,
        }
    }

    /// Subscribe to committed queue changes
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: QueueEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Join the end of a destination's line
    ///
    /// Fails with `Domain(InvalidPartySize)` before touching the store,
    /// `UnknownDestination`, or `AlreadyQueued`.
    pub async fn join(
        &self,
        destination: &DestinationId,
        requester: &RequesterId,
        party_size: i64,
    ) -> Result<QueueMembership> {
        let party_size = PartySize::new(party_size)?;

        let _guard = self.locks.acquire(destination).await;
        let membership = with_timeout(
            self.store_timeout,
            "join",
            join::execute(
                self.tx_repo.as_ref(),
                self.time_provider.as_ref(),
                destination,
                requester,
                party_size,
            ),
        )
        .await?;

        info!(
            destination = %destination,
            requester = %requester,
            party_size = party_size.get(),
            sequence = membership.sequence,
            "Joined queue"
        );
        self.publish(QueueEvent::Joined {
            destination: destination.clone(),
            requester: requester.clone(),
            sequence: membership.sequence,
        });
        Ok(membership)
    }

    /// Leave a destination's line
    pub async fn leave(&self, destination: &DestinationId, requester: &RequesterId) -> Result<()> {
        let _guard = self.locks.acquire(destination).await;
        with_timeout(
            self.store_timeout,
            "leave",
            leave::execute(self.tx_repo.as_ref(), destination, requester),
        )
        .await?;

        info!(destination = %destination, requester = %requester, "Left queue");
        self.publish(QueueEvent::Left {
            destination: destination.clone(),
            requester: requester.clone(),
        });
        Ok(())
    }

    /// Admit the next batch from the head of the line
    pub async fn serve_next_batch(&self, destination: &DestinationId) -> Result<ServeOutcome> {
        let _guard = self.locks.acquire(destination).await;
        let outcome = with_timeout(
            self.store_timeout,
            "serve",
            serve::execute(self.tx_repo.as_ref(), destination),
        )
        .await?;

        if outcome.admitted.is_empty() {
            debug!(destination = %destination, "Nobody waiting to serve");
            return Ok(outcome);
        }

        info!(
            destination = %destination,
            parties = outcome.admitted.len(),
            people = outcome.people_admitted,
            day_count = outcome.day_count,
            "Served batch"
        );
        self.publish(QueueEvent::Served {
            destination: destination.clone(),
            admitted: outcome
                .admitted
                .iter()
                .map(|m| m.requester.clone())
                .collect(),
        });
        Ok(outcome)
    }

    /// Current memberships of a destination ordered by sequence
    ///
    /// An unknown destination has an empty line.
    pub async fn snapshot(&self, destination: &DestinationId) -> Result<Vec<QueueMembership>> {
        self.retry
            .run_keyed("snapshot", destination.as_str(), || {
                with_timeout(
                    self.store_timeout,
                    "snapshot",
                    self.queue_repo.snapshot(destination),
                )
            })
            .await
    }

    /// Destinations that currently have at least one membership
    pub async fn active_destinations(&self) -> Result<Vec<DestinationId>> {
        self.retry
            .run("active_destinations", || {
                with_timeout(
                    self.store_timeout,
                    "active_destinations",
                    self.queue_repo.active_destinations(),
                )
            })
            .await
    }
}
