// Requester Identity Model

use crate::domain::error::{DomainError, Result};
use crate::domain::membership::PartySize;
use serde::{Deserialize, Serialize};

const MAX_REQUESTER_ID_LEN: usize = 128;

/// Opaque requester identity (UUID v4 in production)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterId(String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an externally supplied identity
    pub fn parse(id: &str) -> Result<Self> {
        if id.is_empty() || id.len() > MAX_REQUESTER_ID_LEN {
            return Err(DomainError::ValidationError(format!(
                "Requester id must be 1-{} characters",
                MAX_REQUESTER_ID_LEN
            )));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DomainError::ValidationError(
                "Requester id cannot contain whitespace".to_string(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequesterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity record kept in the local device cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIdentity {
    pub requester_id: RequesterId,

    /// The single active destination selection (display name)
    #[serde(default)]
    pub selected_destination: Option<String>,
    #[serde(default)]
    pub party_size: Option<PartySize>,
}

impl LocalIdentity {
    pub fn new(requester_id: RequesterId) -> Self {
        Self {
            requester_id,
            selected_destination: None,
            party_size: None,
        }
    }

    /// Replace the active selection
    pub fn select(&mut self, destination: impl Into<String>, party_size: PartySize) {
        self.selected_destination = Some(destination.into());
        self.party_size = Some(party_size);
    }

    pub fn clear_selection(&mut self) {
        self.selected_destination = None;
        self.party_size = None;
    }
}
