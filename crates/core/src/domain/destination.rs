// Destination Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Maximum length of a destination display name (after trimming)
pub const MAX_NAME_LEN: usize = 64;

/// Required number of digits in a contact phone number
pub const PHONE_DIGITS: usize = 10;

/// Destination identifier
///
/// Canonical form of the display name (trimmed, lower-cased), so that
/// "Cafe Nero" and "cafe nero " resolve to the same destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn from_name(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DestinationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner contact details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub website: String,
    pub phone: String,
}

/// Owner registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub contact: ContactInfo,
    /// Maximum number of people admitted per batch
    pub entry_rate: u32,
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::ValidationError(
                "Destination name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::ValidationError(format!(
                "Destination name too long (max {} characters)",
                MAX_NAME_LEN
            )));
        }
        if !self.contact.website.starts_with("https://") {
            return Err(DomainError::ValidationError(
                "Website must start with https://".to_string(),
            ));
        }
        let phone = &self.contact.phone;
        if phone.len() != PHONE_DIGITS || !phone.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::ValidationError(format!(
                "Phone number must be exactly {} digits",
                PHONE_DIGITS
            )));
        }
        if self.entry_rate < 1 {
            return Err(DomainError::ValidationError(
                "Entry rate must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Destination Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub display_name: String,
    pub contact: ContactInfo,
    pub entry_rate: u32,

    /// Customers served since the last daily reset
    pub day_count: u64,
    pub last_reset_at: i64, // epoch ms
    pub created_at: i64,    // epoch ms
}

impl Destination {
    /// Create a destination from a validated registration
    ///
    /// Starts with `day_count = 0`; the creation instant counts as the first reset.
    pub fn register(registration: Registration, now_millis: i64) -> Result<Self> {
        registration.validate()?;

        let display_name = registration.name.trim().to_string();
        Ok(Self {
            id: DestinationId::from_name(&display_name),
            display_name,
            contact: registration.contact,
            entry_rate: registration.entry_rate,
            day_count: 0,
            last_reset_at: now_millis,
            created_at: now_millis,
        })
    }

    /// Case-insensitive substring match (empty query matches everything)
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty() || self.id.as_str().contains(&query)
    }

    /// True if the last reset happened before the given boundary
    pub fn needs_reset(&self, boundary_millis: i64) -> bool {
        self.last_reset_at < boundary_millis
    }
}
