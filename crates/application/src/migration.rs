//! Schema migration engine
//!
//! Migrations run on the raw persisted record, before it is decoded into
//! [`StorageData`](hostvar_domain::StorageData), so a step can add fields the
//! typed model would otherwise default silently. Every step is additive and a
//! no-op on data that already has its shape, which makes the whole run
//! idempotent.

use chrono::{DateTime, Utc};
use hostvar_domain::storage::{VARIABLES_KEY, VERSION_KEY};
use hostvar_domain::{CURRENT_SCHEMA_VERSION, LEGACY_SCHEMA_VERSION, SchemaVersion};
use serde_json::Value;
use tracing::{debug, warn};

use crate::ports::{IdGenerator, Record};

/// A version-gated transform of the persisted document.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Applied when the stored version is strictly before this one.
    pub before: &'static str,
    /// Short description for logs.
    pub description: &'static str,
    /// The transform itself.
    pub apply: fn(&mut Record),
}

/// Every known migration, oldest first.
pub const MIGRATIONS: &[Migration] = &[Migration {
    before: "2.0.0",
    description: "add host scoping to variables",
    apply: add_hosts_field,
}];

/// Gives every variable without a `hosts` field an empty list.
fn add_hosts_field(doc: &mut Record) {
    let Some(Value::Array(variables)) = doc.get_mut(VARIABLES_KEY) else {
        return;
    };

    for variable in variables.iter_mut().filter_map(Value::as_object_mut) {
        variable
            .entry("hosts")
            .or_insert_with(|| Value::Array(Vec::new()));
    }
}

fn is_timestamp(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|text| text.parse::<DateTime<Utc>>().is_ok())
}

/// Repairs stored variables so the document always decodes.
///
/// Entries that are not objects or have no string key are dropped. A
/// missing or empty `id` gets a fresh one, missing `hosts` become global,
/// and unreadable timestamps are set to `now` (`updatedAt` falls back to
/// `createdAt` first). Returns true if anything changed.
pub fn normalize_variables(doc: &mut Record, ids: &dyn IdGenerator, now: DateTime<Utc>) -> bool {
    let Some(Value::Array(variables)) = doc.get_mut(VARIABLES_KEY) else {
        return false;
    };

    let before = variables.len();
    variables.retain(|v| v.get("key").is_some_and(Value::is_string));
    let mut changed = variables.len() != before;
    if changed {
        warn!(
            dropped = before - variables.len(),
            "Dropped stored variables without a key"
        );
    }

    let stamp = Value::String(now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    for variable in variables.iter_mut().filter_map(Value::as_object_mut) {
        if !variable
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty())
        {
            variable.insert("id".into(), Value::String(ids.generate()));
            changed = true;
        }
        if !variable.get("hosts").is_some_and(Value::is_array) {
            variable.insert("hosts".into(), Value::Array(Vec::new()));
            changed = true;
        }
        if !is_timestamp(variable.get("createdAt")) {
            variable.insert("createdAt".into(), stamp.clone());
            changed = true;
        }
        if !is_timestamp(variable.get("updatedAt")) {
            let created = variable.get("createdAt").cloned().unwrap_or_else(|| stamp.clone());
            variable.insert("updatedAt".into(), created);
            changed = true;
        }
    }

    if changed {
        debug!("Normalized stored variables");
    }
    changed
}

/// Returns the schema version of a persisted document.
///
/// A document with variables but no version marker predates versioning and
/// is treated as [`LEGACY_SCHEMA_VERSION`]. A document with neither has never
/// been initialized and yields `None`.
#[must_use]
pub fn stored_version(doc: &Record) -> Option<SchemaVersion> {
    match doc.get(VERSION_KEY).and_then(Value::as_str) {
        Some(version) => Some(SchemaVersion::parse(version)),
        None if doc.contains_key(VARIABLES_KEY) => Some(SchemaVersion::parse(LEGACY_SCHEMA_VERSION)),
        None => None,
    }
}

/// Returns true if the document is older than the current schema.
#[must_use]
pub fn needs_migration(doc: &Record) -> bool {
    let current = SchemaVersion::parse(CURRENT_SCHEMA_VERSION);
    stored_version(doc).is_some_and(|version| version.is_before(&current))
}

/// Upgrades `doc` to the current schema.
///
/// Steps whose boundary is after the stored version run in order, then the
/// version marker is bumped. Documents that are current, newer, or not yet
/// initialized come back unchanged.
#[must_use]
pub fn run_migrations(mut doc: Record) -> Record {
    let Some(version) = stored_version(&doc) else {
        return doc;
    };
    let current = SchemaVersion::parse(CURRENT_SCHEMA_VERSION);

    for migration in MIGRATIONS {
        if version.is_before(&SchemaVersion::parse(migration.before)) {
            debug!(
                from = %version,
                before = migration.before,
                "Running migration: {}",
                migration.description
            );
            (migration.apply)(&mut doc);
        }
    }

    if version.is_before(&current) {
        doc.insert(
            VERSION_KEY.to_string(),
            Value::String(CURRENT_SCHEMA_VERSION.to_string()),
        );
    }

    doc
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    fn v1_document() -> Record {
        record(json!({
            "version": "1.0.0",
            "variables": [
                {"id": "1", "key": "A", "value": "a", "enabled": true},
                {"id": "2", "key": "B", "value": "b", "enabled": false, "hosts": ["x.com"]}
            ]
        }))
    }

    #[test]
    fn v1_gains_hosts_and_current_version() {
        let migrated = run_migrations(v1_document());
        assert_eq!(
            Value::Object(migrated),
            json!({
                "version": "2.0.0",
                "variables": [
                    {"id": "1", "key": "A", "value": "a", "enabled": true, "hosts": []},
                    {"id": "2", "key": "B", "value": "b", "enabled": false, "hosts": ["x.com"]}
                ]
            })
        );
    }

    #[test]
    fn running_twice_equals_running_once() {
        let once = run_migrations(v1_document());
        let twice = run_migrations(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn unversioned_document_with_variables_is_legacy() {
        let doc = record(json!({"variables": [{"id": "1", "key": "A"}]}));
        assert_eq!(stored_version(&doc), Some(SchemaVersion::new(1, 0, 0)));
        assert!(needs_migration(&doc));

        let migrated = run_migrations(doc);
        assert_eq!(migrated.get("version"), Some(&json!("2.0.0")));
        assert_eq!(migrated["variables"][0]["hosts"], json!([]));
    }

    #[test]
    fn empty_document_is_left_alone() {
        let doc = Record::new();
        assert_eq!(stored_version(&doc), None);
        assert!(!needs_migration(&doc));
        assert_eq!(run_migrations(doc), Record::new());
    }

    #[test]
    fn current_document_is_unchanged() {
        let doc = record(json!({"version": "2.0.0", "variables": [{"id": "1", "key": "A"}]}));
        assert!(!needs_migration(&doc));
        assert_eq!(run_migrations(doc.clone()), doc);
    }

    #[test]
    fn newer_document_is_never_downgraded() {
        let doc = record(json!({"version": "3.1", "variables": []}));
        assert!(!needs_migration(&doc));
        assert_eq!(run_migrations(doc.clone()), doc);
    }

    #[test]
    fn short_versions_compare_with_missing_components_as_zero() {
        let doc = record(json!({"version": "1.9", "variables": [{"key": "A"}]}));
        assert!(needs_migration(&doc));
        let doc = record(json!({"version": "2", "variables": [{"key": "A"}]}));
        assert!(!needs_migration(&doc));
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let migrated = run_migrations(record(json!({
            "version": "1.0.0",
            "variables": ["junk", {"key": "A"}]
        })));
        assert_eq!(migrated["variables"], json!(["junk", {"key": "A", "hosts": []}]));
    }

    #[test]
    fn normalize_repairs_missing_ids_and_timestamps() {
        let ids = crate::test_support::SequentialIds::default();
        let now = "2024-01-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mut doc = record(json!({
            "version": "2.0.0",
            "variables": [
                {"key": "A", "value": "a", "hosts": null},
                {"id": "x", "key": "B", "value": "b", "createdAt": "2023-01-01T00:00:00Z"},
                {"id": "y", "value": "keyless"},
                "junk"
            ]
        }));

        assert!(normalize_variables(&mut doc, &ids, now));
        assert_eq!(
            doc["variables"],
            json!([
                {
                    "id": "id-1", "key": "A", "value": "a", "hosts": [],
                    "createdAt": "2024-01-15T10:00:00.000Z",
                    "updatedAt": "2024-01-15T10:00:00.000Z"
                },
                {
                    "id": "x", "key": "B", "value": "b", "hosts": [],
                    "createdAt": "2023-01-01T00:00:00Z",
                    "updatedAt": "2023-01-01T00:00:00Z"
                }
            ])
        );
        assert!(!normalize_variables(&mut doc, &ids, now));
    }

    #[test]
    fn normalize_ignores_documents_without_a_list() {
        let ids = crate::test_support::SequentialIds::default();
        let mut doc = record(json!({"version": "2.0.0", "variables": "not a list"}));
        assert!(!normalize_variables(&mut doc, &ids, Utc::now()));
        assert_eq!(doc["variables"], json!("not a list"));
    }
}
