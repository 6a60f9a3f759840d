//! # Error Types
//!
//! Error taxonomy for the workflow engine and metrics aggregator using
//! thiserror for structured error types instead of `Box<dyn Error>` patterns.

use thiserror::Error;

/// Errors surfaced by workflow and analytics operations
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: i64 },

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Concurrent update detected on {entity} {id}; retry with fresh state")]
    ConcurrencyConflict { entity: String, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl WorkflowError {
    /// Create a not-found error for a missing entity id
    pub fn not_found(entity: impl Into<String>, id: i64) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id,
        }
    }

    /// Create an invalid-transition error from displayable states
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a concurrency-conflict error for a lost update
    pub fn concurrency_conflict(entity: impl Into<String>, id: i64) -> Self {
        Self::ConcurrencyConflict {
            entity: entity.into(),
            id,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the failed operation once with fresh
    /// state. Only lost-update conflicts qualify; every other variant is
    /// surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Result type alias for workflow and analytics operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
