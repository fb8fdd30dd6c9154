//! User Settings Domain Model
//!
//! Defines the singleton settings record stored next to the variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Theme mode preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light mode theme (default).
    #[default]
    Light,
    /// Dark mode theme.
    Dark,
    /// Follow system theme preference.
    System,
}

impl ThemeMode {
    /// Returns the lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

/// When page integrations should substitute placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementTrigger {
    /// Replace when a field loses focus (default).
    #[default]
    OnBlur,
    /// Replace only on explicit request.
    Manual,
    /// Replace when a form is submitted.
    OnSubmit,
}

impl ReplacementTrigger {
    /// Returns the lowercase name used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnBlur => "onblur",
            Self::Manual => "manual",
            Self::OnSubmit => "onsubmit",
        }
    }
}

/// Error returned when parsing a settings enum from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseSettingError {
    kind: &'static str,
    value: String,
}

impl FromStr for ThemeMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            _ => Err(ParseSettingError {
                kind: "theme",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for ReplacementTrigger {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onblur" => Ok(Self::OnBlur),
            "manual" => Ok(Self::Manual),
            "onsubmit" => Ok(Self::OnSubmit),
            _ => Err(ParseSettingError {
                kind: "replacement trigger",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ReplacementTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings record.
///
/// Every field has a default, so a partially stored record decodes as the
/// defaults overlaid with whatever was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Global on/off switch for substitution.
    pub enabled: bool,

    /// Reserved for case-insensitive key matching. Substitution is currently
    /// always case-sensitive.
    pub case_sensitive: bool,

    /// When page integrations substitute placeholders.
    pub replacement_trigger: ReplacementTrigger,

    /// Keyboard shortcut label, display only.
    pub shortcut_key: String,

    /// Theme preference.
    pub theme: ThemeMode,
}

/// Shortcut label shown when none is configured.
pub const DEFAULT_SHORTCUT_KEY: &str = "Ctrl+Shift+E";

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            case_sensitive: false,
            replacement_trigger: ReplacementTrigger::default(),
            shortcut_key: DEFAULT_SHORTCUT_KEY.to_string(),
            theme: ThemeMode::default(),
        }
    }
}
