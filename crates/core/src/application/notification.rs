// Proximity alert debounce
//
// Fires when a position is at or under the threshold and either nobody has
// been alerted for this membership yet, or the position has improved since
// the last alert. Repeated observations of the same position stay silent.

use crate::application::position::should_notify;
use crate::domain::{DestinationId, RequesterId};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

type MembershipKey = (DestinationId, RequesterId);

/// Remembers the last alerted position per membership
///
/// State is in memory only; a restart may send one repeat alert.
pub struct NotificationTracker {
    threshold: u64,
    last_notified: Mutex<HashMap<MembershipKey, u64>>,
}

impl NotificationTracker {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            last_notified: Mutex::new(HashMap::new()),
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Record an observed position, returns true if an alert should be sent
    pub fn observe(
        &self,
        destination: &DestinationId,
        requester: &RequesterId,
        position: u64,
    ) -> bool {
        if !should_notify(position, self.threshold) {
            return false;
        }

        let mut last = self.lock();
        let key = (destination.clone(), requester.clone());
        match last.get(&key) {
            Some(&previous) if position >= previous => false,
            _ => {
                last.insert(key, position);
                true
            }
        }
    }

    /// Forget a membership (left or admitted)
    pub fn forget(&self, destination: &DestinationId, requester: &RequesterId) {
        self.lock().remove(&(destination.clone(), requester.clone()));
    }

    /// Forget every membership of `destination` not in `active`
    pub fn retain_active(&self, destination: &DestinationId, active: &HashSet<&RequesterId>) {
        self.lock()
            .retain(|(dest, requester), _| dest != destination || active.contains(requester));
    }

    /// Number of memberships currently tracked
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MembershipKey, u64>> {
        self.last_notified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
