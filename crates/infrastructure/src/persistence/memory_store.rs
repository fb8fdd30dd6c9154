//! In-memory storage area.

use std::sync::Arc;

use async_trait::async_trait;
use hostvar_application::ports::{
    DEFAULT_QUOTA_BYTES, KeyValueStore, Record, StorageArea, StorageBackendError, StorageChange,
};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use super::{CHANGE_CHANNEL_CAPACITY, check_quota, merge, select};
use crate::serialization::record_size;

struct Inner {
    items: RwLock<Record>,
    changes: broadcast::Sender<StorageChange>,
    area: StorageArea,
    quota: u64,
}

/// A storage area held in memory.
///
/// Clones share contents and change feed, so stores built on clones act
/// like separate contexts of one browser profile.
#[derive(Clone)]
pub struct MemoryKeyValueStore {
    inner: Arc<Inner>,
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyValueStore {
    /// Creates an empty local area with the default quota.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StorageArea::Local, DEFAULT_QUOTA_BYTES)
    }

    /// Creates an empty area with the given identity and quota.
    #[must_use]
    pub fn with_options(area: StorageArea, quota: u64) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                items: RwLock::new(Record::new()),
                changes,
                area,
                quota,
            }),
        }
    }

    fn publish(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        trace!(?keys, area = ?self.inner.area, "Publishing storage change");
        // No receivers is fine.
        let _ = self.inner.changes.send(StorageChange {
            keys,
            area: self.inner.area,
        });
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, keys: Option<&[&str]>) -> Result<Record, StorageBackendError> {
        Ok(select(&self.inner.items.read(), keys))
    }

    async fn set(&self, items: Record) -> Result<(), StorageBackendError> {
        let changed = {
            let mut current = self.inner.items.write();
            let mut next = current.clone();
            let changed = merge(&mut next, items);
            check_quota(&next, self.inner.quota)?;
            *current = next;
            changed
        };
        self.publish(changed);
        Ok(())
    }

    async fn bytes_in_use(&self) -> Result<u64, StorageBackendError> {
        Ok(record_size(&self.inner.items.read())?)
    }

    fn quota_bytes(&self) -> u64 {
        self.inner.quota
    }

    fn area(&self) -> StorageArea {
        self.inner.area
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.inner.changes.subscribe()
    }
}
