// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid party size: {0} (must be at least 1)")]
    InvalidPartySize(i64),

    #[error("Invalid rating: {0} (must be between 1 and 5)")]
    InvalidRating(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
