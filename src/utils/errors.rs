//! Error handling for CampusHub
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for CampusHub operations
#[derive(Error, Debug)]
pub enum CampusHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Location not found: {location_id}")]
    LocationNotFound { location_id: i64 },

    #[error("Registration not found for event {event_id}, user {user_id}")]
    RegistrationNotFound { event_id: i64, user_id: i64 },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User is already registered for this event")]
    AlreadyRegistered,

    #[error("User is already on the waitlist for this event")]
    AlreadyWaitlisted,

    #[error("User is not registered for this event")]
    NotRegistered,

    #[error("User category is not permitted for this event")]
    CategoryRestricted,

    #[error("Event date is in the past")]
    EventInPast,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CampusHub operations
pub type Result<T> = std::result::Result<T, CampusHubError>;

/// Coarse classification used by outer layers to map errors onto a
/// deterministic response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    BadRequest,
    Internal,
}

impl CampusHubError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CampusHubError::UserNotFound { .. }
            | CampusHubError::EventNotFound { .. }
            | CampusHubError::LocationNotFound { .. }
            | CampusHubError::RegistrationNotFound { .. } => ErrorKind::NotFound,
            CampusHubError::AlreadyRegistered
            | CampusHubError::AlreadyWaitlisted => ErrorKind::Conflict,
            CampusHubError::PermissionDenied(_)
            | CampusHubError::CategoryRestricted => ErrorKind::Forbidden,
            CampusHubError::InvalidTransition { .. }
            | CampusHubError::Validation(_)
            | CampusHubError::NotRegistered
            | CampusHubError::EventInPast => ErrorKind::BadRequest,
            CampusHubError::Database(_)
            | CampusHubError::Migration(_)
            | CampusHubError::Config(_)
            | CampusHubError::Serialization(_)
            | CampusHubError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Check if the error is recoverable by retrying the operation
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CampusHubError::Database(_) | CampusHubError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CampusHubError::EventNotFound { event_id: 1 }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(CampusHubError::AlreadyRegistered.kind(), ErrorKind::Conflict);
        assert_eq!(
            CampusHubError::PermissionDenied("nope".to_string()).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            CampusHubError::InvalidTransition {
                from: "draft".to_string(),
                to: "published".to_string()
            }
            .kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(CampusHubError::EventInPast.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_recoverable() {
        assert!(!CampusHubError::AlreadyRegistered.is_recoverable());
        assert!(!CampusHubError::Validation("bad".to_string()).is_recoverable());
    }
}
