//! Errors the domain layer itself can produce.
//!
//! Only deterministic business failures live here. Anything an adapter can
//! hit (storage, transport, serialization) belongs to the infra error types
//! and gets mapped at that boundary.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input was malformed before any business rule ran, for example a
    /// check-out date on or before the check-in date.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A rule about current state was broken, for example transitioning a
    /// booking that is already completed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier could not be parsed.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// The referenced aggregate or entity does not exist for this property.
    #[error("not found")]
    NotFound,

    /// State moved underneath the caller: an overlapping stay, a stale
    /// version, a duplicate room number.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Shorthand for fallible domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
