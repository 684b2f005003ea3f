// Notification Sink Port
// Fire-and-forget user alerts, no delivery guarantee

use crate::domain::{DestinationId, RequesterId};
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub destination: DestinationId,
    pub requester: RequesterId,
    pub position: u64,
    pub title: String,
    pub body: String,
}

impl Notification {
    /// Standard "you are near the front" alert
    pub fn near_front(destination: DestinationId, requester: RequesterId, position: u64) -> Self {
        Self {
            destination,
            requester,
            position,
            title: "Queue Update".to_string(),
            body: format!(
                "You are in position {} of the line. Please come back to the queue.",
                position
            ),
        }
    }
}

/// Notification sink
///
/// Implementations log their own failures; callers never see them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    /// Records every notification
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        pub fn count_for(&self, requester: &RequesterId) -> usize {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|n| &n.requester == requester)
                .count()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(notification.clone());
        }
    }
}
