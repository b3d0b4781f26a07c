//! Error taxonomy for frontdesk operations.

use thiserror::Error;

use stayforge_core::DomainError;
use stayforge_infra::command_dispatcher::DispatchError;

/// Operation errors, grouped by how callers should react.
#[derive(Debug, Error)]
pub enum FrontdeskError {
    /// The request is malformed or breaks a domain rule. Retrying without
    /// changing the input will fail again.
    #[error("{0}")]
    Validation(String),
    /// The referenced resource does not exist in this property.
    #[error("{0}")]
    NotFound(String),
    /// Another commit got there first: a stale version, an overlapping
    /// claim, or a duplicate identifier.
    #[error("{0}")]
    Conflict(String),
    /// Infrastructure failure; nothing the caller sent was wrong.
    #[error("{0}")]
    Internal(String),
}

impl FrontdeskError {
    /// Stable machine-readable code, used as the API error identifier.
    pub fn code(&self) -> &'static str {
        match self {
            FrontdeskError::Validation(_) => "validation_error",
            FrontdeskError::NotFound(_) => "not_found",
            FrontdeskError::Conflict(_) => "conflict",
            FrontdeskError::Internal(_) => "internal_error",
        }
    }
}

impl From<DomainError> for FrontdeskError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => FrontdeskError::Validation(msg),
            DomainError::NotFound => FrontdeskError::NotFound("resource not found".to_string()),
            DomainError::Conflict(msg) => FrontdeskError::Conflict(msg),
        }
    }
}

impl From<DispatchError> for FrontdeskError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Validation(msg) | DispatchError::InvariantViolation(msg) => {
                FrontdeskError::Validation(msg)
            }
            DispatchError::NotFound => FrontdeskError::NotFound("resource not found".to_string()),
            DispatchError::Concurrency(msg) => FrontdeskError::Conflict(msg),
            DispatchError::PropertyIsolation(msg)
            | DispatchError::Deserialize(msg)
            | DispatchError::Publish(msg) => FrontdeskError::Internal(msg),
            DispatchError::Store(err) => FrontdeskError::Internal(err.to_string()),
        }
    }
}
