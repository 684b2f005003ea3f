// In-memory store implementing every storage port
// Used by core unit tests and as a reference adapter; NOT durable.

use crate::domain::{
    Destination, DestinationId, Feedback, QueueMembership, RequesterId, SequenceNumber,
};
use crate::error::{AppError, Result};
use crate::port::{
    DestinationRepository, FeedbackRepository, QueueRepository, QueueTransaction, Transaction,
    TransactionalQueueRepository,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone)]
struct DestinationRecord {
    destination: Destination,
    last_sequence: SequenceNumber,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    destinations: BTreeMap<DestinationId, DestinationRecord>,
    /// Sorted by sequence ascending
    memberships: BTreeMap<DestinationId, Vec<QueueMembership>>,
    feedback: Vec<Feedback>,
}

/// Shared in-memory store
///
/// Readers copy out of the committed state under a short read lock.
/// Writers are serialised and work on a staged copy that replaces the
/// committed state on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    committed: Arc<RwLock<StoreState>>,
    writer: Arc<Mutex<()>>,
    failing_reads: Arc<AtomicU32>,
    failing_writes: Arc<AtomicU32>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` snapshot reads fail with TransientStore
    pub fn fail_next_reads(&self, n: u32) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` transactions fail to begin with TransientStore
    pub fn fail_next_writes(&self, n: u32) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    fn injected_failure(counter: &AtomicU32) -> Result<()> {
        let took = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took {
            return Err(AppError::TransientStore(
                "injected store failure".to_string(),
            ));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> T {
        let state = self.committed.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }
}

#[async_trait]
impl DestinationRepository for InMemoryStore {
    async fn insert(&self, destination: &Destination) -> Result<()> {
        let _guard = self.writer.lock().await;
        let mut state = self.committed.write().unwrap_or_else(PoisonError::into_inner);
        if state.destinations.contains_key(&destination.id) {
            return Err(AppError::DuplicateName(destination.display_name.clone()));
        }
        state.destinations.insert(
            destination.id.clone(),
            DestinationRecord {
                destination: destination.clone(),
                last_sequence: 0,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &DestinationId) -> Result<Option<Destination>> {
        Ok(self.read(|s| s.destinations.get(id).map(|r| r.destination.clone())))
    }

    async fn search(&self, query: &str) -> Result<Vec<Destination>> {
        Ok(self.read(|s| {
            s.destinations
                .values()
                .map(|r| &r.destination)
                .filter(|d| d.matches(query))
                .cloned()
                .collect()
        }))
    }

    async fn reset_day_counts(&self, boundary_millis: i64, now_millis: i64) -> Result<u64> {
        let _guard = self.writer.lock().await;
        let mut state = self.committed.write().unwrap_or_else(PoisonError::into_inner);
        let mut reset = 0;
        for record in state.destinations.values_mut() {
            if record.destination.needs_reset(boundary_millis) {
                record.destination.day_count = 0;
                record.destination.last_reset_at = now_millis;
                reset += 1;
            }
        }
        Ok(reset)
    }
}

#[async_trait]
impl QueueRepository for InMemoryStore {
    async fn snapshot(&self, destination: &DestinationId) -> Result<Vec<QueueMembership>> {
        Self::injected_failure(&self.failing_reads)?;
        Ok(self.read(|s| s.memberships.get(destination).cloned().unwrap_or_default()))
    }

    async fn active_destinations(&self) -> Result<Vec<DestinationId>> {
        Ok(self.read(|s| {
            s.memberships
                .iter()
                .filter(|(_, members)| !members.is_empty())
                .map(|(id, _)| id.clone())
                .collect()
        }))
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryStore {
    async fn insert(&self, feedback: &Feedback) -> Result<()> {
        let _guard = self.writer.lock().await;
        self.committed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .feedback
            .push(feedback.clone());
        Ok(())
    }

    async fn list_for_destination(
        &self,
        destination: &DestinationId,
        limit: usize,
    ) -> Result<Vec<Feedback>> {
        Ok(self.read(|s| {
            s.feedback
                .iter()
                .rev()
                .filter(|f| &f.destination == destination)
                .take(limit)
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl TransactionalQueueRepository for InMemoryStore {
    async fn begin_transaction(&self) -> Result<Box<dyn QueueTransaction>> {
        Self::injected_failure(&self.failing_writes)?;
        let guard = Arc::clone(&self.writer).lock_owned().await;
        let staged = self.read(|s| s.clone());
        Ok(Box::new(InMemoryTransaction {
            _guard: guard,
            staged,
            committed: Arc::clone(&self.committed),
        }))
    }
}

/// Staged copy of the store, published on commit
pub struct InMemoryTransaction {
    _guard: OwnedMutexGuard<()>,
    staged: StoreState,
    committed: Arc<RwLock<StoreState>>,
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        *this.committed.write().unwrap_or_else(PoisonError::into_inner) = this.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl QueueTransaction for InMemoryTransaction {
    async fn get_destination(&mut self, id: &DestinationId) -> Result<Option<Destination>> {
        Ok(self.staged.destinations.get(id).map(|r| r.destination.clone()))
    }

    async fn claim_next_sequence(&mut self, id: &DestinationId) -> Result<Option<SequenceNumber>> {
        Ok(self.staged.destinations.get_mut(id).map(|record| {
            record.last_sequence += 1;
            record.last_sequence
        }))
    }

    async fn find_membership(
        &mut self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<Option<QueueMembership>> {
        Ok(self
            .staged
            .memberships
            .get(destination)
            .and_then(|members| members.iter().find(|m| &m.requester == requester))
            .cloned())
    }

    async fn insert_membership(&mut self, membership: &QueueMembership) -> Result<()> {
        let members = self
            .staged
            .memberships
            .entry(membership.destination.clone())
            .or_default();
        if members.iter().any(|m| m.requester == membership.requester) {
            return Err(AppError::already_queued(
                &membership.destination,
                &membership.requester,
            ));
        }
        let at = members.partition_point(|m| m.sequence < membership.sequence);
        members.insert(at, membership.clone());
        Ok(())
    }

    async fn delete_membership(
        &mut self,
        destination: &DestinationId,
        requester: &RequesterId,
    ) -> Result<bool> {
        let Some(members) = self.staged.memberships.get_mut(destination) else {
            return Ok(false);
        };
        let before = members.len();
        members.retain(|m| &m.requester != requester);
        Ok(members.len() != before)
    }

    async fn memberships(&mut self, destination: &DestinationId) -> Result<Vec<QueueMembership>> {
        Ok(self
            .staged
            .memberships
            .get(destination)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_to_day_count(&mut self, destination: &DestinationId, people: u64) -> Result<()> {
        let record = self
            .staged
            .destinations
            .get_mut(destination)
            .ok_or_else(|| AppError::UnknownDestination(destination.to_string()))?;
        record.destination.day_count += people;
        Ok(())
    }
}
