//! Key-value persistence port
//!
//! Models a browser-profile style local storage area: a flat map of
//! top-level keys to JSON values, with a change feed shared by every handle
//! on the same area.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A set of top-level keys and their JSON values.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Default quota for a local storage area (10 MiB).
pub const DEFAULT_QUOTA_BYTES: u64 = 10 * 1024 * 1024;

/// Identifies which storage area a change happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Local to this profile.
    Local,
    /// Synchronized across devices.
    Sync,
    /// Lives only for the session.
    Session,
}

/// A change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageChange {
    /// Top-level keys whose values changed.
    pub keys: Vec<String>,
    /// Area the change happened in.
    pub area: StorageArea,
}

/// Errors raised by a persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageBackendError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The write would exceed the area's quota.
    #[error("Quota exceeded: {required} bytes required, {quota} allowed")]
    QuotaExceeded {
        /// Size the area would have after the write.
        required: u64,
        /// Maximum size of the area.
        quota: u64,
    },

    /// The backend cannot be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous key-value persistence.
///
/// `set` merges the given top-level keys into the area and leaves other keys
/// untouched. Every handle cloned from the same backend shares one change
/// feed, so a write through one handle is observed by subscribers of all.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the given keys, or every key when `keys` is `None`.
    /// Missing keys are simply absent from the result.
    async fn get(&self, keys: Option<&[&str]>) -> Result<Record, StorageBackendError>;

    /// Merges `items` into the area.
    async fn set(&self, items: Record) -> Result<(), StorageBackendError>;

    /// Returns the number of bytes the area currently uses.
    async fn bytes_in_use(&self) -> Result<u64, StorageBackendError>;

    /// Returns the maximum number of bytes the area may use.
    fn quota_bytes(&self) -> u64;

    /// Returns the area this backend writes to.
    fn area(&self) -> StorageArea {
        StorageArea::Local
    }

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;

    /// Reads every key in the area.
    async fn get_all(&self) -> Result<Record, StorageBackendError> {
        self.get(None).await
    }
}
