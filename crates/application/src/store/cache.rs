//! Time-bounded snapshot cache for the storage document.

use std::time::Duration;

use hostvar_domain::StorageData;
use parking_lot::Mutex;
use tokio::time::Instant;

struct Snapshot {
    data: StorageData,
    stored_at: Instant,
}

/// Holds at most one copy of the document and hands it out while it is
/// younger than the TTL.
///
/// Uses the tokio clock so paused-time tests can expire it.
pub struct SnapshotCache {
    ttl: Duration,
    slot: Mutex<Option<Snapshot>>,
}

impl SnapshotCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns a copy of the cached document if it is still fresh.
    pub fn get(&self) -> Option<StorageData> {
        let slot = self.slot.lock();
        slot.as_ref()
            .filter(|snapshot| snapshot.stored_at.elapsed() < self.ttl)
            .map(|snapshot| snapshot.data.clone())
    }

    /// Replaces the cached document and restarts its lifetime.
    pub fn put(&self, data: StorageData) {
        *self.slot.lock() = Some(Snapshot {
            data,
            stored_at: Instant::now(),
        });
    }

    /// Drops the cached document.
    pub fn invalidate(&self) {
        *self.slot.lock() = None;
    }

    /// Returns the configured lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = SnapshotCache::new(Duration::from_secs(5));
        assert!(cache.get().is_none());

        cache.put(StorageData::default());
        assert!(cache.get().is_some());

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(cache.get().is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn put_restarts_lifetime() {
        let cache = SnapshotCache::new(Duration::from_secs(5));
        cache.put(StorageData::default());
        tokio::time::advance(Duration::from_secs(4)).await;
        cache.put(StorageData::default());
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get().is_some());
    }

    #[test]
    fn invalidate_clears() {
        let cache = SnapshotCache::new(Duration::from_secs(5));
        cache.put(StorageData::default());
        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = SnapshotCache::new(Duration::ZERO);
        cache.put(StorageData::default());
        assert!(cache.get().is_none());
    }
}
