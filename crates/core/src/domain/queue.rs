// Queue Domain Model

use crate::domain::destination::DestinationId;
use crate::domain::identity::RequesterId;
use crate::domain::membership::SequenceNumber;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default proximity threshold for the "come back" alert (people)
pub const DEFAULT_NOTIFY_THRESHOLD: u64 = 30;

/// Queue behaviour settings
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    /// Alert when position drops to or below this value
    pub notify_threshold: u64,
    /// Periodic position recompute interval
    pub refresh_interval: Duration,
    /// Upper bound for a single store call
    pub store_timeout: Duration,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            notify_threshold: DEFAULT_NOTIFY_THRESHOLD,
            refresh_interval: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Change notification published after a committed queue mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueEvent {
    Joined {
        destination: DestinationId,
        requester: RequesterId,
        sequence: SequenceNumber,
    },
    Left {
        destination: DestinationId,
        requester: RequesterId,
    },
    Served {
        destination: DestinationId,
        admitted: Vec<RequesterId>,
    },
}

impl QueueEvent {
    pub fn destination(&self) -> &DestinationId {
        match self {
            QueueEvent::Joined { destination, .. }
            | QueueEvent::Left { destination, .. }
            | QueueEvent::Served { destination, .. } => destination,
        }
    }
}
