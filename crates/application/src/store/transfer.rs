//! Parsing and materializing imported variables.
//!
//! Everything here runs before the store takes its write lock, so a rejected
//! payload never touches persisted state.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use hostvar_domain::{Settings, ValidationError, ValidationResult, Variable, VariableDraft};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::migration::run_migrations;
use crate::ports::{IdGenerator, Record};

/// What an import did to the variable list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Records in the payload.
    pub imported: usize,
    /// Existing records overwritten because they shared a key.
    pub replaced: usize,
    /// Records added with new keys.
    pub appended: usize,
}

/// A validated full-document backup, ready to be written.
#[derive(Debug, Clone)]
pub struct Restore {
    /// Variables to store, ids included.
    pub variables: Vec<Variable>,
    /// Settings to store, `None` when the backup had none.
    pub settings: Option<Settings>,
}

fn parse_object(text: &str) -> ValidationResult<Record> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(ValidationError::InvalidFormat),
        Err(e) => Err(ValidationError::InvalidJson(e.to_string())),
    }
}

/// Decodes and validates every entry of the `variables` array.
///
/// Stops at the first bad record and names it. Keys must also be unique
/// within the payload.
fn parse_drafts(doc: &Record) -> ValidationResult<Vec<VariableDraft>> {
    let Some(items) = doc.get("variables").and_then(Value::as_array) else {
        return Err(ValidationError::InvalidFormat);
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut drafts = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let hint = item
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let draft: VariableDraft = serde_json::from_value(item.clone())
            .map_err(|e| ValidationError::InvalidJson(e.to_string()).in_import(index, &hint))?;

        let key = draft
            .validate()
            .map_err(|e| e.in_import(index, &hint))?
            .to_string();

        if !seen.insert(key.clone()) {
            return Err(ValidationError::DuplicateKey(key.clone()).in_import(index, key));
        }

        drafts.push(draft);
    }

    Ok(drafts)
}

/// Parses an export payload into validated drafts.
///
/// # Errors
///
/// `INVALID_JSON` for unparseable text, `INVALID_FORMAT` when there is no
/// variables array, `INVALID_VARIABLE` for the first bad record.
pub fn parse_import(text: &str) -> ValidationResult<Vec<VariableDraft>> {
    let doc = parse_object(text)?;
    parse_drafts(&doc)
}

/// Parses a full backup. Older backups are migrated first.
///
/// # Errors
///
/// Same as [`parse_import`], plus `INVALID_JSON` for an undecodable
/// settings record.
pub fn parse_backup(
    text: &str,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
) -> ValidationResult<Restore> {
    let doc = run_migrations(parse_object(text)?);
    let drafts = parse_drafts(&doc)?;

    let settings = doc
        .get("settings")
        .map(|value| serde_json::from_value::<Settings>(value.clone()))
        .transpose()
        .map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

    let mut seen_ids = HashSet::with_capacity(drafts.len());
    let variables = drafts
        .into_iter()
        .map(|mut draft| {
            let id = draft
                .id
                .take()
                .filter(|id| !id.is_empty() && seen_ids.insert(id.clone()))
                .unwrap_or_else(|| ids.generate());
            materialize(id, draft, now)
        })
        .collect();

    Ok(Restore {
        variables,
        settings,
    })
}

/// Builds a stored record from an imported draft.
///
/// The caller supplies the id. An incoming `createdAt` survives; `updatedAt`
/// is always `now`.
#[must_use]
pub fn materialize(id: String, mut draft: VariableDraft, now: DateTime<Utc>) -> Variable {
    let created_at = draft.created_at.take();
    let mut variable = Variable::create(id, draft, now);
    if let Some(created_at) = created_at {
        variable.created_at = created_at;
    }
    variable
}

/// Overwrites records sharing a key and appends the rest.
pub fn merge_into(existing: &mut Vec<Variable>, incoming: Vec<Variable>) -> ImportSummary {
    let mut summary = ImportSummary {
        imported: incoming.len(),
        ..ImportSummary::default()
    };

    for variable in incoming {
        if let Some(slot) = existing.iter_mut().find(|v| v.key == variable.key) {
            *slot = variable;
            summary.replaced += 1;
        } else {
            existing.push(variable);
            summary.appended += 1;
        }
    }

    summary
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::test_support::SequentialIds;
    use hostvar_domain::ErrorCode;
    use pretty_assertions::assert_eq;

    fn code_of(result: ValidationResult<Vec<VariableDraft>>) -> ErrorCode {
        result.expect_err("import should fail").code()
    }

    #[test]
    fn rejects_malformed_json() {
        assert_eq!(code_of(parse_import("{not json")), ErrorCode::InvalidJson);
    }

    #[test]
    fn rejects_missing_or_non_array_variables() {
        assert_eq!(code_of(parse_import("{}")), ErrorCode::InvalidFormat);
        assert_eq!(
            code_of(parse_import(r#"{"variables": {}}"#)),
            ErrorCode::InvalidFormat
        );
        assert_eq!(code_of(parse_import("[]")), ErrorCode::InvalidFormat);
    }

    #[test]
    fn names_the_first_invalid_record() {
        let err = parse_import(
            r#"{"variables": [{"key": "OK", "value": "1"}, {"key": "BAD-KEY"}, {"key": ""}]}"#,
        )
        .expect_err("second record is invalid");

        assert_eq!(err.code(), ErrorCode::InvalidVariable);
        match err {
            ValidationError::InvalidVariable { index, key, source } => {
                assert_eq!(index, 1);
                assert_eq!(key, "BAD-KEY");
                assert_eq!(source.code(), ErrorCode::InvalidKeyFormat);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_host_in_record() {
        let err = parse_import(r#"{"variables": [{"key": "A", "hosts": ["bad host"]}]}"#)
            .expect_err("host is invalid");
        let ValidationError::InvalidVariable { source, .. } = err else {
            panic!("expected an import error");
        };
        assert_eq!(source.code(), ErrorCode::InvalidHostPattern);
    }

    #[test]
    fn rejects_duplicate_keys_within_payload() {
        let err = parse_import(r#"{"variables": [{"key": "A"}, {"key": "A"}]}"#)
            .expect_err("duplicate key");
        let ValidationError::InvalidVariable { index, source, .. } = err else {
            panic!("expected an import error");
        };
        assert_eq!(index, 1);
        assert_eq!(source.code(), ErrorCode::DuplicateKey);
    }

    #[test]
    fn wrongly_typed_fields_are_invalid_records() {
        let err = parse_import(r#"{"variables": [{"key": "A", "value": 42}]}"#)
            .expect_err("value must be a string");
        assert_eq!(err.code(), ErrorCode::InvalidVariable);
    }

    #[test]
    fn unreadable_created_at_falls_back_to_now() {
        let drafts = parse_import(
            r#"{"variables": [
                {"key": "A", "value": "1", "createdAt": ""},
                {"key": "B", "value": "2", "createdAt": "not a date"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(drafts.len(), 2);

        let now = Utc::now();
        for draft in drafts {
            assert_eq!(draft.created_at, None);
            let variable = materialize("id".into(), draft, now);
            assert_eq!(variable.created_at, now);
        }
    }

    #[test]
    fn materialize_keeps_created_at_and_stamps_updated_at() {
        let now = Utc::now();
        let earlier: DateTime<Utc> = "2023-03-01T12:00:00Z".parse().unwrap();
        let mut draft = VariableDraft::new("A", "a");
        draft.created_at = Some(earlier);

        let variable = materialize("new-id".into(), draft, now);
        assert_eq!(variable.id, "new-id");
        assert_eq!(variable.created_at, earlier);
        assert_eq!(variable.updated_at, now);
        assert!(variable.enabled);
        assert!(variable.hosts.is_empty());
    }

    #[test]
    fn merge_overwrites_by_key_and_appends() {
        let now = Utc::now();
        let mut existing = vec![
            Variable::create("1", VariableDraft::new("VAR1", "old"), now),
            Variable::create("2", VariableDraft::new("VAR2", "two"), now),
        ];
        let incoming = vec![
            Variable::create("3", VariableDraft::new("VAR1", "new"), now),
            Variable::create("4", VariableDraft::new("VAR3", "three"), now),
        ];

        let summary = merge_into(&mut existing, incoming);

        assert_eq!(
            summary,
            ImportSummary {
                imported: 2,
                replaced: 1,
                appended: 1,
            }
        );
        let pairs: Vec<_> = existing
            .iter()
            .map(|v| (v.key.as_str(), v.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("VAR1", "new"), ("VAR2", "two"), ("VAR3", "three")]);
    }

    #[test]
    fn backup_keeps_ids_and_migrates_legacy_records() {
        let ids = SequentialIds::default();
        let restore = parse_backup(
            r#"{
                "version": "1.0.0",
                "variables": [
                    {"id": "keep-me", "key": "A", "value": "a"},
                    {"key": "B", "value": "b"},
                    {"id": "keep-me", "key": "C", "value": "c"}
                ],
                "settings": {"enabled": false}
            }"#,
            &ids,
            Utc::now(),
        )
        .unwrap();

        let ids: Vec<_> = restore.variables.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["keep-me", "id-1", "id-2"]);
        assert!(restore.variables.iter().all(|v| v.hosts.is_empty()));

        let settings = restore.settings.unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.shortcut_key, Settings::default().shortcut_key);
    }

    #[test]
    fn backup_without_settings_leaves_them_unset() {
        let restore = parse_backup(
            r#"{"variables": []}"#,
            &SequentialIds::default(),
            Utc::now(),
        )
        .unwrap();
        assert!(restore.variables.is_empty());
        assert!(restore.settings.is_none());
    }
}
