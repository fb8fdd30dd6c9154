//! Application error types

use hostvar_domain::{ErrorCode, ValidationError};
use thiserror::Error;

use crate::ports::StorageBackendError;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A user-correctable validation failure. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The persistence backend failed. Propagated unchanged.
    #[error("storage backend error: {0}")]
    Backend(#[from] StorageBackendError),

    /// The persisted document could not be decoded.
    #[error("corrupt storage document: {0}")]
    Corrupt(String),

    /// The targeted record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Returns the validation code, if this is a validation failure.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Validation(err) => Some(err.code()),
            _ => None,
        }
    }

    /// Returns true for failures a user can correct (show, do not crash).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_recoverable_and_coded() {
        let err = StoreError::from(ValidationError::DuplicateKey("A".into()));
        assert!(err.is_recoverable());
        assert_eq!(err.code(), Some(ErrorCode::DuplicateKey));
        assert_eq!(err.to_string(), "a variable with key \"A\" already exists");
    }

    #[test]
    fn backend_errors_are_not_recoverable() {
        let err = StoreError::from(StorageBackendError::Unavailable("offline".into()));
        assert!(!err.is_recoverable());
        assert_eq!(err.code(), None);
    }
}
