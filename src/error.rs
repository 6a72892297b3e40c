//! Error handling module
//!
//! Provides the moderation error taxonomy and its mapping onto the
//! `RequestStatus` values returned by every mutating operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// Engine-wide error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModerationError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Malformed proposal: {0}")]
    MalformedProposal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("In use: {0}")]
    InUse(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<validator::ValidationErrors> for ModerationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ModerationError::Validation(errors.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ModerationError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        ModerationError::Store("store lock poisoned".to_string())
    }
}

/// Outcome of a mutating operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Success,
    SentToModeration,
    Failure,
    NotFound,
    InUse,
    InvalidInput,
    AccessDenied,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Success => "SUCCESS",
            RequestStatus::SentToModeration => "SENT_TO_MODERATION",
            RequestStatus::Failure => "FAILURE",
            RequestStatus::NotFound => "NOT_FOUND",
            RequestStatus::InUse => "IN_USE",
            RequestStatus::InvalidInput => "INVALID_INPUT",
            RequestStatus::AccessDenied => "ACCESS_DENIED",
        };
        write!(f, "{}", s)
    }
}

impl ModerationError {
    /// Map the error onto the status a caller sees, logging it on the way
    pub fn into_status(self) -> RequestStatus {
        match &self {
            ModerationError::NotFound(msg) => {
                warn!("Target not found: {}", msg);
                RequestStatus::NotFound
            }
            ModerationError::Forbidden(msg) => {
                warn!("Access denied: {}", msg);
                RequestStatus::AccessDenied
            }
            ModerationError::MalformedProposal(msg)
            | ModerationError::Validation(msg)
            | ModerationError::InvalidTransition(msg) => {
                warn!("Rejected invalid input: {}", msg);
                RequestStatus::InvalidInput
            }
            ModerationError::Conflict(msg) => {
                warn!("Write conflict, caller must retry: {}", msg);
                RequestStatus::Failure
            }
            ModerationError::InUse(msg) => {
                warn!("Deletion blocked: {}", msg);
                RequestStatus::InUse
            }
            ModerationError::Store(msg) => {
                error!("Store error: {}", msg);
                RequestStatus::Failure
            }
        }
    }
}

/// Result type alias for engine operations
pub type ModerationResult<T> = Result<T, ModerationError>;

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> ModerationError {
    ModerationError::NotFound(msg.into())
}

/// Helper function to create a malformed proposal error
pub fn malformed_error(msg: impl Into<String>) -> ModerationError {
    ModerationError::MalformedProposal(msg.into())
}

/// Helper function to create a conflict error
pub fn conflict_error(msg: impl Into<String>) -> ModerationError {
    ModerationError::Conflict(msg.into())
}

/// Helper function to create a forbidden error
pub fn forbidden_error(msg: impl Into<String>) -> ModerationError {
    ModerationError::Forbidden(msg.into())
}
