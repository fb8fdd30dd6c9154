//! The persisted storage document and its transport forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::variable::Variable;

/// Current schema version written with every document.
pub const CURRENT_SCHEMA_VERSION: &str = "2.0.0";

/// Version assumed for documents that predate the version marker.
pub const LEGACY_SCHEMA_VERSION: &str = "1.0.0";

/// Top-level key holding the schema version.
pub const VERSION_KEY: &str = "version";

/// Top-level key holding the variable list.
pub const VARIABLES_KEY: &str = "variables";

/// Top-level key holding the settings record.
pub const SETTINGS_KEY: &str = "settings";

/// The root aggregate: everything the store persists.
///
/// The whole document is the unit of persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageData {
    /// Schema version of this document.
    #[serde(default = "current_version")]
    pub version: String,

    /// Variables in insertion order.
    #[serde(default)]
    pub variables: Vec<Variable>,

    /// Settings record.
    #[serde(default)]
    pub settings: Settings,
}

fn current_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

impl Default for StorageData {
    fn default() -> Self {
        Self {
            version: current_version(),
            variables: Vec::new(),
            settings: Settings::default(),
        }
    }
}

impl StorageData {
    /// Finds a variable by exact key.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.key == key)
    }

    /// Returns the index of the variable with this id.
    #[must_use]
    pub fn position_by_id(&self, id: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.id == id)
    }

    /// Returns the index of the variable with this key.
    #[must_use]
    pub fn position_by_key(&self, key: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.key == key)
    }

    /// Returns true if a variable other than `except_id` uses `key`.
    #[must_use]
    pub fn key_taken(&self, key: &str, except_id: Option<&str>) -> bool {
        self.variables
            .iter()
            .any(|v| v.key == key && Some(v.id.as_str()) != except_id)
    }
}

/// The transport form produced by a variable export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Schema version of the exporting store.
    pub version: String,
    /// When the export was produced.
    pub exported_at: DateTime<Utc>,
    /// Exported variables.
    pub variables: Vec<Variable>,
}

/// A full backup: variables and settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    /// Schema version of the exporting store.
    pub version: String,
    /// When the backup was produced.
    pub exported_at: DateTime<Utc>,
    /// Backed up variables, ids included.
    pub variables: Vec<Variable>,
    /// Backed up settings.
    pub settings: Settings,
}
