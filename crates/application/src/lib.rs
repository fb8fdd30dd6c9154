//! Hostvar Application - Store, migrations and substitution
//!
//! This crate defines the application layer with:
//! - Port traits (persistence backend, clock, id generator)
//! - The variable store with its cache, validation and import/export
//! - Schema migrations
//! - Placeholder substitution and host-scoped resolution
//! - The typed message protocol used by UI surfaces

pub mod error;
pub mod messaging;
pub mod migration;
pub mod ports;
pub mod resolver;
pub mod store;
pub mod substitution;

#[cfg(test)]
mod test_support;

pub use error::{StoreError, StoreResult};
pub use messaging::{Message, MessageHandler, Response};
pub use migration::{needs_migration, run_migrations};
pub use resolver::{HostResolver, filter_variables_by_host, is_global_variable};
pub use store::{
    DEFAULT_CACHE_TTL, ImportSummary, StorageStats, StoreConfig, Subscription, VariableStore,
};
pub use substitution::{Substitution, replace_variables};
