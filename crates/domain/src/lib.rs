//! Hostvar Domain - Core business types
//!
//! This crate defines the domain model for host-scoped placeholder variables:
//! the variable records, user settings, the persisted storage document and the
//! host pattern grammar that decides where a variable is visible.
//! All types here are pure Rust with no I/O dependencies.

pub mod error;
pub mod host;
pub mod id;
pub mod settings;
pub mod storage;
pub mod variable;
pub mod version;

pub use error::{ErrorCode, HostPatternError, ValidationError, ValidationResult};
pub use host::{
    HostPattern, Origin, format_host_display, match_host, parse_host_pattern,
    validate_host_pattern,
};
pub use id::generate_id;
pub use settings::{ParseSettingError, ReplacementTrigger, Settings, ThemeMode};
pub use storage::{
    BackupDocument, CURRENT_SCHEMA_VERSION, ExportDocument, LEGACY_SCHEMA_VERSION, StorageData,
};
pub use variable::{MAX_KEY_LENGTH, MAX_VALUE_LENGTH, Variable, VariableDraft, is_valid_key};
pub use version::SchemaVersion;
