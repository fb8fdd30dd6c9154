//! Variable records and their validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::host::validate_host_pattern;

/// Longest accepted variable key.
pub const MAX_KEY_LENGTH: usize = 50;

/// Longest accepted variable value.
pub const MAX_VALUE_LENGTH: usize = 10_000;

/// Returns true if `key` is non-empty and only contains `[A-Za-z0-9_]`.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

const fn default_enabled() -> bool {
    true
}

/// A named value substituted for `{{key}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Store-assigned identifier, immutable once created.
    pub id: String,

    /// Placeholder name, unique across the collection.
    pub key: String,

    /// Replacement text. Inserted verbatim, never re-scanned.
    #[serde(default)]
    pub value: String,

    /// Free-text annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Disabled variables stay stored but are never substituted.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Host patterns restricting visibility. Empty means global.
    #[serde(default)]
    pub hosts: Vec<String>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Variable {
    /// Builds a new record from a validated draft.
    ///
    /// Missing fields default to an empty value, `enabled = true` and no
    /// hosts. Both timestamps are set to `now`.
    #[must_use]
    pub fn create(id: impl Into<String>, draft: VariableDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            key: draft.key.unwrap_or_default(),
            value: draft.value.unwrap_or_default(),
            description: draft.description,
            enabled: draft.enabled.unwrap_or(true),
            hosts: draft.hosts.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges the fields present in `draft` over this record.
    ///
    /// `id` and `created_at` are never touched; `updated_at` becomes `now`.
    pub fn apply(&mut self, draft: VariableDraft, now: DateTime<Utc>) {
        if let Some(key) = draft.key {
            self.key = key;
        }
        if let Some(value) = draft.value {
            self.value = value;
        }
        if let Some(description) = draft.description {
            self.description = Some(description);
        }
        if let Some(enabled) = draft.enabled {
            self.enabled = enabled;
        }
        if let Some(hosts) = draft.hosts {
            self.hosts = hosts;
        }
        self.updated_at = now;
    }

    /// Returns true if the variable applies to every host.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Returns the value if the variable is enabled.
    #[must_use]
    pub fn enabled_value(&self) -> Option<&str> {
        self.enabled.then_some(self.value.as_str())
    }

    /// Returns true if key, value or description contains `needle`.
    /// `needle` must already be lowercase.
    #[must_use]
    pub fn contains_lowercase(&self, needle: &str) -> bool {
        self.key.to_lowercase().contains(needle)
            || self.value.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

/// A partial variable used to create or update a record.
///
/// A draft with an `id` that matches a stored record is an update; anything
/// else creates a new record with a freshly generated id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDraft {
    /// Identifier of the record to update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Placeholder name. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Replacement text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Free-text annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the variable is substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Host patterns restricting visibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,

    /// Creation time carried by imported records. Unreadable timestamps
    /// decode as `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(RawTimestamp::Text(text)) => text.parse().ok(),
        Some(RawTimestamp::Other(_)) | None => None,
    })
}

impl VariableDraft {
    /// Creates a draft with a key and value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Targets an existing record.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the host patterns.
    #[must_use]
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = Some(hosts.into_iter().map(Into::into).collect());
        self
    }

    /// Validates the draft and returns its key.
    ///
    /// Checks run in order and stop at the first failure: key present and
    /// non-empty, key length, key charset, value length, every host pattern.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn validate(&self) -> ValidationResult<&str> {
        let key = match self.key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ValidationError::MissingKey),
        };

        if key.chars().count() > MAX_KEY_LENGTH {
            return Err(ValidationError::KeyTooLong {
                max: MAX_KEY_LENGTH,
            });
        }

        if !is_valid_key(key) {
            return Err(ValidationError::InvalidKeyFormat(key.to_string()));
        }

        if self
            .value
            .as_deref()
            .is_some_and(|value| value.chars().count() > MAX_VALUE_LENGTH)
        {
            return Err(ValidationError::ValueTooLong {
                max: MAX_VALUE_LENGTH,
            });
        }

        for pattern in self.hosts.iter().flatten() {
            validate_host_pattern(pattern).map_err(|reason| {
                ValidationError::InvalidHostPattern {
                    pattern: pattern.clone(),
                    reason,
                }
            })?;
        }

        Ok(key)
    }
}

impl From<&Variable> for VariableDraft {
    fn from(variable: &Variable) -> Self {
        Self {
            id: Some(variable.id.clone()),
            key: Some(variable.key.clone()),
            value: Some(variable.value.clone()),
            description: variable.description.clone(),
            enabled: Some(variable.enabled),
            hosts: Some(variable.hosts.clone()),
            created_at: Some(variable.created_at),
        }
    }
}
