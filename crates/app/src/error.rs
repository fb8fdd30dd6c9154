//! CLI error type.

use std::path::PathBuf;

use hostvar_application::StoreError;
use hostvar_infrastructure::ConfigError;
use thiserror::Error;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file could not be read or written.
    #[error("{path}: {source}")]
    File {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// An origin argument could not be understood.
    #[error("invalid origin {input:?}: {reason}")]
    InvalidOrigin {
        /// Argument as given.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The requested variable does not exist.
    #[error("no variable named {0:?}")]
    UnknownKey(String),

    /// Output could not be encoded.
    #[error("could not encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit code for this error.
    ///
    /// Validation failures and missing keys are user errors (2), everything
    /// else is a runtime failure (1).
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        let user_error = match self {
            Self::Store(err) => err.is_recoverable(),
            Self::InvalidOrigin { .. } | Self::UnknownKey(_) => true,
            _ => false,
        };
        if user_error { 2 } else { 1 }
    }
}

/// Result alias for CLI commands.
pub type AppResult<T> = Result<T, AppError>;
