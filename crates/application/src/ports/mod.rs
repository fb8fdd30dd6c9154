//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the store and its environment: the
//! key-value persistence backend, the clock and the identifier generator.
//! Adapters live in the infrastructure layer.

mod clock;
mod id_generator;
mod key_value_store;

pub use clock::Clock;
pub use id_generator::IdGenerator;
pub use key_value_store::{
    DEFAULT_QUOTA_BYTES, KeyValueStore, Record, StorageArea, StorageBackendError, StorageChange,
};
