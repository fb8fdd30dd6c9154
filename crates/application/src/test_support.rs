//! In-crate test doubles for the ports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::ports::{
    Clock, IdGenerator, KeyValueStore, Record, StorageArea, StorageBackendError, StorageChange,
};

/// A map-backed store whose clones share state and change feed.
#[derive(Clone)]
pub struct MockBackend {
    items: Arc<Mutex<Record>>,
    changes: broadcast::Sender<StorageChange>,
    fail_writes: Arc<AtomicBool>,
    reads: Arc<AtomicU64>,
}

impl MockBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            items: Arc::new(Mutex::new(Record::new())),
            changes,
            fail_writes: Arc::new(AtomicBool::new(false)),
            reads: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_record(record: Record) -> Self {
        let backend = Self::new();
        *backend.items.lock() = record;
        backend
    }

    /// Replaces the raw contents without notifying, like a stale peer.
    pub fn overwrite_silently(&self, record: Record) {
        *self.items.lock() = record;
    }

    pub fn snapshot(&self) -> Record {
        self.items.lock().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MockBackend {
    async fn get(&self, keys: Option<&[&str]>) -> Result<Record, StorageBackendError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let items = self.items.lock();
        Ok(match keys {
            None => items.clone(),
            Some(keys) => items
                .iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }

    async fn set(&self, record: Record) -> Result<(), StorageBackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageBackendError::Unavailable("writes disabled".into()));
        }
        let keys: Vec<String> = record.keys().cloned().collect();
        self.items.lock().extend(record);
        let _ = self.changes.send(StorageChange {
            keys,
            area: StorageArea::Local,
        });
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<u64, StorageBackendError> {
        let text = serde_json::to_string(&*self.items.lock())
            .map_err(|e| StorageBackendError::Serialization(e.to_string()))?;
        Ok(text.len() as u64)
    }

    fn quota_bytes(&self) -> u64 {
        1024
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new() -> Self {
        Self(Mutex::new(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()))
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.0.lock() += TimeDelta::seconds(secs);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// Generates `id-1`, `id-2`, ...
#[derive(Default)]
pub struct SequentialIds(AtomicU64);

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Builds a JSON object record.
pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
