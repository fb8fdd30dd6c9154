//! Hostvar Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports defined in the
//! application layer: in-memory and file-backed storage areas, the system
//! clock, UUID identifiers, plus configuration loading.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod serialization;

pub use adapters::{SystemClock, UuidIdGenerator};
pub use config::{AppConfig, ConfigError};
pub use persistence::{FileKeyValueStore, MemoryKeyValueStore};
pub use serialization::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};
