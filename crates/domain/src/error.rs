//! Domain error types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable code attached to every validation failure.
///
/// The string form (`INVALID_KEY`, `DUPLICATE_KEY`, ...) is stable and is what
/// callers across a message boundary match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The key is missing or empty.
    InvalidKey,
    /// The key contains characters outside `[A-Za-z0-9_]`.
    InvalidKeyFormat,
    /// The key exceeds the maximum length.
    KeyTooLong,
    /// The value exceeds the maximum length.
    ValueTooLong,
    /// A host pattern does not follow the host grammar.
    InvalidHostPattern,
    /// Another variable already uses the key.
    DuplicateKey,
    /// Import text is not valid JSON.
    InvalidJson,
    /// Import payload has no variables array.
    InvalidFormat,
    /// One of the imported variables failed validation.
    InvalidVariable,
}

impl ErrorCode {
    /// Returns the stable string form of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidKey => "INVALID_KEY",
            Self::InvalidKeyFormat => "INVALID_KEY_FORMAT",
            Self::KeyTooLong => "KEY_TOO_LONG",
            Self::ValueTooLong => "VALUE_TOO_LONG",
            Self::InvalidHostPattern => "INVALID_HOST_PATTERN",
            Self::DuplicateKey => "DUPLICATE_KEY",
            Self::InvalidJson => "INVALID_JSON",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidVariable => "INVALID_VARIABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a host pattern is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HostPatternError {
    /// The pattern is empty or whitespace only.
    #[error("host pattern cannot be empty")]
    Empty,

    /// The pattern is longer than 253 characters.
    #[error("host pattern must be at most 253 characters")]
    TooLong,

    /// The pattern does not match `hostname`, `hostname:port` or `*`.
    #[error("use the format hostname, hostname:port, or *")]
    Malformed,

    /// The port is outside 1..=65535.
    #[error("port must be between 1 and 65535")]
    PortOutOfRange,
}

/// User-correctable validation failures.
///
/// These are raised before any write is attempted, so a failure never leaves
/// the persisted document half-updated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The key is missing or empty.
    #[error("variable key is required")]
    MissingKey,

    /// The key is longer than allowed.
    #[error("variable key must be at most {max} characters")]
    KeyTooLong {
        /// Maximum accepted length.
        max: usize,
    },

    /// The key contains characters outside `[A-Za-z0-9_]`.
    #[error("variable key \"{0}\" may only contain letters, digits and underscores")]
    InvalidKeyFormat(String),

    /// The value is longer than allowed.
    #[error("variable value must be at most {max} characters")]
    ValueTooLong {
        /// Maximum accepted length.
        max: usize,
    },

    /// A host pattern is invalid.
    #[error("invalid host \"{pattern}\": {reason}")]
    InvalidHostPattern {
        /// The offending pattern as supplied.
        pattern: String,
        /// Why it was rejected.
        reason: HostPatternError,
    },

    /// Another variable already uses this key.
    #[error("a variable with key \"{0}\" already exists")]
    DuplicateKey(String),

    /// Import text could not be parsed as JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Import payload is missing the `variables` array.
    #[error("payload does not contain a valid variables array")]
    InvalidFormat,

    /// An imported record failed validation; the whole import is aborted.
    #[error("error in variable #{index} \"{key}\": {source}")]
    InvalidVariable {
        /// Position of the record in the imported list.
        index: usize,
        /// Key of the record, empty when it had none.
        key: String,
        /// The underlying failure.
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Returns the machine-readable code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingKey => ErrorCode::InvalidKey,
            Self::KeyTooLong { .. } => ErrorCode::KeyTooLong,
            Self::InvalidKeyFormat(_) => ErrorCode::InvalidKeyFormat,
            Self::ValueTooLong { .. } => ErrorCode::ValueTooLong,
            Self::InvalidHostPattern { .. } => ErrorCode::InvalidHostPattern,
            Self::DuplicateKey(_) => ErrorCode::DuplicateKey,
            Self::InvalidJson(_) => ErrorCode::InvalidJson,
            Self::InvalidFormat => ErrorCode::InvalidFormat,
            Self::InvalidVariable { .. } => ErrorCode::InvalidVariable,
        }
    }

    /// Wraps this failure as the error of an imported record.
    #[must_use]
    pub fn in_import(self, index: usize, key: impl Into<String>) -> Self {
        Self::InvalidVariable {
            index,
            key: key.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_stable_strings() {
        assert_eq!(ValidationError::MissingKey.code().as_str(), "INVALID_KEY");
        assert_eq!(
            ValidationError::DuplicateKey("A".into()).code().to_string(),
            "DUPLICATE_KEY"
        );
        assert_eq!(
            ValidationError::InvalidFormat.code(),
            ErrorCode::InvalidFormat
        );
    }

    #[test]
    fn code_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::InvalidHostPattern).unwrap_or_default();
        assert_eq!(json, "\"INVALID_HOST_PATTERN\"");
    }

    #[test]
    fn import_wrapper_names_the_key() {
        let err = ValidationError::InvalidKeyFormat("BAD-KEY".into()).in_import(2, "BAD-KEY");
        assert_eq!(err.code(), ErrorCode::InvalidVariable);
        let message = err.to_string();
        assert!(message.contains("#2"));
        assert!(message.contains("BAD-KEY"));
    }

    #[test]
    fn host_error_message_mentions_reason() {
        let err = ValidationError::InvalidHostPattern {
            pattern: "bad host".into(),
            reason: HostPatternError::Malformed,
        };
        assert!(err.to_string().contains("bad host"));
        assert!(err.to_string().contains("hostname:port"));
    }
}
