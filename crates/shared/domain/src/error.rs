//! Domain-level errors.
//!
//! These errors represent business rule violations and domain logic failures.
//! They are independent of infrastructure concerns (HTTP, database, identity provider).

use thiserror::Error;

use crate::access::AccessError;
use crate::lifecycle::LifecycleError;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed for a field or input
    #[error("{0}")]
    Validation(String),

    /// Entity not found (or soft-deleted, which looks the same to callers)
    #[error("{0}")]
    NotFound(String),

    /// State conflict: duplicate entity or invalid lifecycle transition
    #[error("{0}")]
    Conflict(String),

    /// Missing or unusable credential
    #[error("{0}")]
    Unauthorized(String),

    /// Principal is known but not allowed to act
    #[error("{0}")]
    Forbidden(String),

    /// Internal domain error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        DomainError::Forbidden(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }
}

impl From<LifecycleError> for DomainError {
    fn from(err: LifecycleError) -> Self {
        DomainError::Conflict(err.to_string())
    }
}

impl From<AccessError> for DomainError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => DomainError::Unauthorized(err.to_string()),
            AccessError::Forbidden(msg) => DomainError::Forbidden(msg),
        }
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
