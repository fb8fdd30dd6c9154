//! JSON-file storage area.
//!
//! The whole area lives in one JSON document. Writes go to a sibling
//! temporary file that is then renamed over the original.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hostvar_application::ports::{
    DEFAULT_QUOTA_BYTES, KeyValueStore, Record, StorageArea, StorageBackendError, StorageChange,
};
use tokio::fs;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, trace};

use super::{CHANGE_CHANNEL_CAPACITY, check_quota, merge, select};
use crate::serialization::{from_json_bytes, record_size, to_json_stable_bytes};

struct Inner {
    path: PathBuf,
    quota: u64,
    changes: broadcast::Sender<StorageChange>,
    write_lock: Mutex<()>,
}

/// A local storage area persisted as a JSON file.
///
/// A missing file reads as an empty area. Changes are published for writes
/// made through this handle and its clones, not for edits by other
/// processes.
#[derive(Clone)]
pub struct FileKeyValueStore {
    inner: Arc<Inner>,
}

impl FileKeyValueStore {
    /// Opens the area stored at `path` with the default quota.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_quota(path, DEFAULT_QUOTA_BYTES)
    }

    /// Opens the area stored at `path` with a custom quota.
    #[must_use]
    pub fn with_quota(path: impl Into<PathBuf>, quota: u64) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                quota,
                changes,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Returns the file backing this area.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    async fn read(&self) -> Result<Record, StorageBackendError> {
        let bytes = match fs::read(&self.inner.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Record::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Record::new());
        }

        Ok(from_json_bytes(&bytes)?)
    }

    async fn write(&self, items: &Record) -> Result<(), StorageBackendError> {
        let path = &self.inner.path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, to_json_stable_bytes(items)?).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), keys = items.len(), "Wrote storage file");
        Ok(())
    }

    fn publish(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        trace!(?keys, "Publishing storage change");
        let _ = self.inner.changes.send(StorageChange {
            keys,
            area: StorageArea::Local,
        });
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, keys: Option<&[&str]>) -> Result<Record, StorageBackendError> {
        let items = self.read().await?;
        Ok(select(&items, keys))
    }

    async fn set(&self, incoming: Record) -> Result<(), StorageBackendError> {
        let _guard = self.inner.write_lock.lock().await;
        let mut items = self.read().await?;
        let changed = merge(&mut items, incoming);
        if changed.is_empty() {
            return Ok(());
        }

        check_quota(&items, self.inner.quota)?;
        self.write(&items).await?;
        self.publish(changed);
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<u64, StorageBackendError> {
        Ok(record_size(&self.read().await?)?)
    }

    fn quota_bytes(&self) -> u64 {
        self.inner.quota
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    fn store_in(dir: &TempDir) -> FileKeyValueStore {
        FileKeyValueStore::new(dir.path().join("nested").join("storage.json"))
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.get_all().await.unwrap().is_empty());
        assert_eq!(store.bytes_in_use().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn writes_create_directories_and_stable_json() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .set(record(json!({"version": "2.0.0", "settings": {"enabled": true}})))
            .await
            .unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            text,
            "{\n  \"settings\": {\n    \"enabled\": true\n  },\n  \"version\": \"2.0.0\"\n}\n"
        );
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn data_survives_reopening() {
        let dir = TempDir::new().unwrap();
        store_in(&dir)
            .set(record(json!({"a": [1, 2, 3]})))
            .await
            .unwrap();

        let reopened = store_in(&dir);
        assert_eq!(
            reopened.get(Some(&["a"][..])).await.unwrap(),
            record(json!({"a": [1, 2, 3]}))
        );
    }

    #[tokio::test]
    async fn set_merges_top_level_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.set(record(json!({"a": 1, "b": 2}))).await.unwrap();
        store.set(record(json!({"b": 3}))).await.unwrap();

        assert_eq!(store.get_all().await.unwrap(), record(json!({"a": 1, "b": 3})));
    }

    #[tokio::test]
    async fn changes_are_published_to_clones() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut changes = store.clone().subscribe();

        store.set(record(json!({"a": 1}))).await.unwrap();
        store.set(record(json!({"a": 1}))).await.unwrap();

        assert_eq!(changes.recv().await.unwrap().keys, vec!["a"]);
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.get_all().await.expect_err("file is corrupt");
        assert!(matches!(err, StorageBackendError::Serialization(_)));
    }

    #[tokio::test]
    async fn quota_is_enforced() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::with_quota(dir.path().join("s.json"), 8);
        let err = store
            .set(record(json!({"key": "too large"})))
            .await
            .expect_err("over quota");
        assert!(matches!(err, StorageBackendError::QuotaExceeded { .. }));
        assert!(!store.path().exists());
    }
}
