// Queue Membership Domain Model

use crate::domain::destination::DestinationId;
use crate::domain::error::{DomainError, Result};
use crate::domain::identity::RequesterId;
use serde::{Deserialize, Serialize};

/// Per-destination join sequence (monotonic, never reused)
pub type SequenceNumber = i64;

/// Number of people a membership represents (>= 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PartySize(u32);

impl PartySize {
    pub fn new(size: i64) -> Result<Self> {
        if size < 1 || size > i64::from(u32::MAX) {
            return Err(DomainError::InvalidPartySize(size));
        }
        Ok(Self(size as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for PartySize {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PartySize> for i64 {
    fn from(size: PartySize) -> Self {
        i64::from(size.0)
    }
}

/// Queue Membership Entity
///
/// A requester's active claim to a place in a destination's line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMembership {
    pub destination: DestinationId,
    pub requester: RequesterId,
    pub party_size: PartySize,
    pub sequence: SequenceNumber,
    pub joined_at: i64, // epoch ms, informational only
}

impl QueueMembership {
    pub fn new(
        destination: DestinationId,
        requester: RequesterId,
        party_size: PartySize,
        sequence: SequenceNumber,
        joined_at: i64,
    ) -> Self {
        Self {
            destination,
            requester,
            party_size,
            sequence,
            joined_at,
        }
    }

    pub fn people(&self) -> u64 {
        u64::from(self.party_size.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_size_bounds() {
        assert_eq!(PartySize::new(0), Err(DomainError::InvalidPartySize(0)));
        assert_eq!(PartySize::new(-3), Err(DomainError::InvalidPartySize(-3)));
        assert_eq!(PartySize::new(1).unwrap().get(), 1);
    }

    #[test]
    fn test_party_size_deserialize_validates() {
        let ok: PartySize = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
        assert!(serde_json::from_str::<PartySize>("0").is_err());
    }
}
