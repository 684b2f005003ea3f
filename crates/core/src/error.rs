// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Destination already exists: {0}")]
    DuplicateName(String),

    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    #[error("Requester {requester} is already queued at {destination}")]
    AlreadyQueued {
        destination: String,
        requester: String,
    },

    #[error("Requester {requester} is not queued at {destination}")]
    NotQueued {
        destination: String,
        requester: String,
    },

    /// Remote store unavailable (busy, timed out, disconnected) - safe to retry reads
    #[error("Transient store error: {0}")]
    TransientStore(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_queued(destination: impl ToString, requester: impl ToString) -> Self {
        AppError::NotQueued {
            destination: destination.to_string(),
            requester: requester.to_string(),
        }
    }

    pub fn already_queued(destination: impl ToString, requester: impl ToString) -> Self {
        AppError::AlreadyQueued {
            destination: destination.to_string(),
            requester: requester.to_string(),
        }
    }

    /// Whether the failure may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientStore(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by mapping into TransientStore / DuplicateName / Database
