//! Key-value storage backends.
//!
//! Both backends behave like a browser storage area: `set` merges top-level
//! keys, writes past the quota are refused, and every handle cloned from the
//! same backend shares one change feed. A change is only published for keys
//! whose value actually changed.

mod file_store;
mod memory_store;

pub use file_store::FileKeyValueStore;
pub use memory_store::MemoryKeyValueStore;

use hostvar_application::ports::{Record, StorageBackendError};

use crate::serialization::record_size;

/// Buffered change notifications per subscriber before it lags.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Copies the requested keys, or everything when `keys` is `None`.
fn select(items: &Record, keys: Option<&[&str]>) -> Record {
    match keys {
        None => items.clone(),
        Some(keys) => keys
            .iter()
            .filter_map(|key| items.get(*key).map(|value| ((*key).to_string(), value.clone())))
            .collect(),
    }
}

/// Merges `incoming` into `items` and returns the keys that changed.
fn merge(items: &mut Record, incoming: Record) -> Vec<String> {
    let mut changed = Vec::new();
    for (key, value) in incoming {
        if items.get(&key) != Some(&value) {
            changed.push(key.clone());
            items.insert(key, value);
        }
    }
    changed
}

/// Fails if `items` would not fit in `quota` bytes.
fn check_quota(items: &Record, quota: u64) -> Result<(), StorageBackendError> {
    let required = record_size(items)?;
    if required > quota {
        return Err(StorageBackendError::QuotaExceeded { required, quota });
    }
    Ok(())
}
