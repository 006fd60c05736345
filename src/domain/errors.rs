//! Domain errors for the reposcore orchestrator.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while orchestrating analysis runs.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl DomainError {
    /// Build a validation error for the named input field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Storage failures that may succeed when the same write is tried again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::ConcurrencyConflict { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = DomainError::validation("team_name", "must not be empty");
        assert_eq!(err.to_string(), "Invalid team_name: must not be empty");
    }

    #[test]
    fn test_transient_errors() {
        assert!(DomainError::DatabaseError("database is locked".to_string()).is_transient());
        assert!(DomainError::ConcurrencyConflict {
            entity: "project".to_string(),
            id: "p1".to_string(),
        }
        .is_transient());
        assert!(!DomainError::Conflict("bug b1 belongs to project p2".to_string()).is_transient());
        assert!(!DomainError::ProjectNotFound(Uuid::nil()).is_transient());
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let err: DomainError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, DomainError::SerializationError(_)));
    }
}
