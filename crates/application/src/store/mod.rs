//! Variable store
//!
//! [`VariableStore`] owns the storage document for one execution context. It
//! validates every write, serves reads from a short-lived cache, migrates old
//! documents on the way in and forwards backend change notifications so
//! each context can drop its cached copy.
//!
//! Several stores may share one backend (a service, a popup, a page). The
//! persisted document is the only shared state and writes are whole-document
//! snapshots, so two contexts racing through read-modify-write can lose an
//! update. Within one store, writes are serialized.

mod cache;
mod subscription;
mod transfer;

use std::sync::Arc;
use std::time::Duration;

use hostvar_domain::{
    BackupDocument, CURRENT_SCHEMA_VERSION, ExportDocument, Settings, StorageData,
    ValidationError, Variable, VariableDraft,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

pub use cache::SnapshotCache;
pub use subscription::Subscription;
pub use transfer::ImportSummary;

use crate::error::{StoreError, StoreResult};
use crate::migration::{needs_migration, normalize_variables, run_migrations, stored_version};
use crate::ports::{Clock, IdGenerator, KeyValueStore, Record, StorageBackendError, StorageChange};

/// How long a cached document is served without rereading the backend.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Store tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Lifetime of the cached document.
    pub cache_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Storage usage as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// Bytes currently used.
    pub bytes_in_use: u64,
    /// Maximum bytes allowed.
    pub quota: u64,
}

enum Outcome<T> {
    Changed(T),
    Unchanged(T),
}

fn encode(data: &StorageData) -> Result<Record, StorageBackendError> {
    match serde_json::to_value(data) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(StorageBackendError::Serialization(
            "storage document is not an object".into(),
        )),
        Err(e) => Err(StorageBackendError::Serialization(e.to_string())),
    }
}

fn decode(record: Record) -> StoreResult<StorageData> {
    serde_json::from_value(Value::Object(record)).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn to_pretty_json<T: Serialize>(value: &T) -> StoreResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| StorageBackendError::Serialization(e.to_string()).into())
}

/// The validated, cached store of variables and settings.
pub struct VariableStore {
    backend: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    cache: Arc<SnapshotCache>,
    write_lock: tokio::sync::Mutex<()>,
}

impl VariableStore {
    /// Creates a store without touching the backend.
    #[must_use]
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: StoreConfig,
    ) -> Self {
        Self {
            backend,
            clock,
            ids,
            cache: Arc::new(SnapshotCache::new(config.cache_ttl)),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates a store and initializes the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or written, or holds
    /// a document that cannot be decoded.
    pub async fn open(
        backend: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let store = Self::new(backend, clock, ids, config);
        store.initialize().await?;
        Ok(store)
    }

    /// Ensures a storage document exists.
    ///
    /// An area with no version marker and no variables gets the default
    /// document. Anything else is loaded, which migrates it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the document is corrupt.
    pub async fn initialize(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let raw = self.backend.get_all().await?;

        if stored_version(&raw).is_none() {
            info!("Initializing empty storage (schema {CURRENT_SCHEMA_VERSION})");
            return self.persist(StorageData::default()).await;
        }

        self.load_from(raw).await.map(drop)
    }

    /// Returns the whole document, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the document is corrupt.
    pub async fn get_data(&self) -> StoreResult<StorageData> {
        if let Some(data) = self.cache.get() {
            debug!("Storage cache hit");
            return Ok(data);
        }

        debug!(
            ttl_ms = self.cache.ttl().as_millis(),
            "Storage cache miss, reading backend"
        );
        let raw = self.backend.get_all().await?;
        self.load_from(raw).await
    }

    /// Migrates, decodes and caches a raw document.
    async fn load_from(&self, raw: Record) -> StoreResult<StorageData> {
        let stale = needs_migration(&raw);
        let mut raw = if stale { run_migrations(raw) } else { raw };
        let repaired = normalize_variables(&mut raw, self.ids.as_ref(), self.clock.now());

        let data = decode(raw).inspect_err(|e| warn!(error = %e, "Stored document is unreadable"))?;

        if stale || repaired {
            info!(
                version = CURRENT_SCHEMA_VERSION,
                variables = data.variables.len(),
                migrated = stale,
                repaired,
                "Persisting migrated storage"
            );
            self.backend.set(encode(&data)?).await?;
        }

        self.cache.put(data.clone());
        Ok(data)
    }

    /// Writes the document and refreshes the cache.
    async fn persist(&self, data: StorageData) -> StoreResult<()> {
        self.backend.set(encode(&data)?).await?;
        self.cache.put(data);
        Ok(())
    }

    /// Runs a read-modify-write cycle under the write lock.
    ///
    /// The closure works on a copy; nothing is written unless it reports a
    /// change, and an error leaves both the backend and the cache untouched.
    async fn update<T, F>(&self, mutate: F) -> StoreResult<T>
    where
        F: FnOnce(&mut StorageData) -> StoreResult<Outcome<T>>,
    {
        let _guard = self.write_lock.lock().await;
        let mut data = self.get_data().await?;

        match mutate(&mut data)? {
            Outcome::Changed(value) => {
                self.persist(data).await?;
                Ok(value)
            }
            Outcome::Unchanged(value) => Ok(value),
        }
    }

    /// Replaces the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub async fn set_data(&self, data: StorageData) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(data).await
    }

    /// Drops the cached document so the next read goes to the backend.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Returns every variable in stored order.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub async fn get_variables(&self) -> StoreResult<Vec<Variable>> {
        Ok(self.get_data().await?.variables)
    }

    /// Returns the variable with this exact key.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub async fn get_variable(&self, key: &str) -> StoreResult<Option<Variable>> {
        let data = self.get_data().await?;
        Ok(data.find_by_key(key).cloned())
    }

    /// Replaces the variable list as given, without validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_variables(&self, variables: Vec<Variable>) -> StoreResult<()> {
        self.update(|data| {
            data.variables = variables;
            Ok(Outcome::Changed(()))
        })
        .await
    }

    /// Returns the settings record.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub async fn get_settings(&self) -> StoreResult<Settings> {
        Ok(self.get_data().await?.settings)
    }

    /// Replaces the settings record.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn set_settings(&self, settings: Settings) -> StoreResult<()> {
        self.update(|data| {
            data.settings = settings;
            Ok(Outcome::Changed(()))
        })
        .await
    }

    /// Flips the global on/off switch and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn toggle_enabled(&self) -> StoreResult<bool> {
        self.update(|data| {
            data.settings.enabled = !data.settings.enabled;
            Ok(Outcome::Changed(data.settings.enabled))
        })
        .await
    }

    /// Creates or updates a variable.
    ///
    /// A draft whose `id` matches a stored record is merged over it. Any
    /// other draft becomes a new record with a generated id, `enabled`
    /// defaulting to true and no hosts. Keys stay unique either way.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O if the draft is invalid,
    /// `DUPLICATE_KEY` if another record holds the key, or a backend error.
    pub async fn save_variable(&self, draft: VariableDraft) -> StoreResult<Variable> {
        let key = draft
            .validate()
            .inspect_err(|e| warn!(code = %e.code(), "Rejected variable: {e}"))?
            .to_string();
        let now = self.clock.now();

        self.update(|data| {
            let existing = draft.id.as_deref().and_then(|id| data.position_by_id(id));

            let owner = existing.and(draft.id.as_deref());
            if data.key_taken(&key, owner) {
                warn!(key = %key, "Rejected duplicate variable key");
                return Err(ValidationError::DuplicateKey(key).into());
            }

            let saved = if let Some(index) = existing {
                let variable = &mut data.variables[index];
                variable.apply(draft, now);
                debug!(id = %variable.id, key = %variable.key, "Updated variable");
                variable.clone()
            } else {
                let variable = Variable::create(self.ids.generate(), draft, now);
                debug!(id = %variable.id, key = %variable.key, "Created variable");
                data.variables.push(variable.clone());
                variable
            };

            Ok(Outcome::Changed(saved))
        })
        .await
    }

    /// Removes the variable with this key. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn delete_variable(&self, key: &str) -> StoreResult<bool> {
        self.update(|data| {
            Ok(match data.position_by_key(key) {
                Some(index) => {
                    data.variables.remove(index);
                    Outcome::Changed(true)
                }
                None => Outcome::Unchanged(false),
            })
        })
        .await
    }

    /// Removes the variable with this id. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn delete_variable_by_id(&self, id: &str) -> StoreResult<bool> {
        self.update(|data| {
            Ok(match data.position_by_id(id) {
                Some(index) => {
                    data.variables.remove(index);
                    Outcome::Changed(true)
                }
                None => Outcome::Unchanged(false),
            })
        })
        .await
    }

    /// Removes every variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written.
    pub async fn clear_variables(&self) -> StoreResult<()> {
        self.update(|data| {
            if data.variables.is_empty() {
                return Ok(Outcome::Unchanged(()));
            }
            data.variables.clear();
            Ok(Outcome::Changed(()))
        })
        .await
    }

    /// Case-insensitive substring search over key, value and description.
    ///
    /// A blank query returns every variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub async fn search_variables(&self, query: &str) -> StoreResult<Vec<Variable>> {
        let variables = self.get_variables().await?;
        if query.trim().is_empty() {
            return Ok(variables);
        }

        let needle = query.to_lowercase();
        Ok(variables
            .into_iter()
            .filter(|v| v.contains_lowercase(&needle))
            .collect())
    }

    /// Serializes the variables as `{version, exportedAt, variables}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub async fn export_variables(&self) -> StoreResult<String> {
        let document = ExportDocument {
            version: CURRENT_SCHEMA_VERSION.to_string(),
            exported_at: self.clock.now(),
            variables: self.get_variables().await?,
        };
        to_pretty_json(&document)
    }

    /// Imports variables from an export payload.
    ///
    /// Every record is validated first; one bad record aborts the import.
    /// Imported records get fresh ids. With `merge`, records sharing a key
    /// are overwritten and new keys appended; otherwise the list is replaced.
    ///
    /// # Errors
    ///
    /// `INVALID_JSON`, `INVALID_FORMAT` or `INVALID_VARIABLE` before any
    /// write, or a backend error.
    pub async fn import_variables(&self, text: &str, merge: bool) -> StoreResult<ImportSummary> {
        let drafts = transfer::parse_import(text)
            .inspect_err(|e| warn!(code = %e.code(), "Rejected import: {e}"))?;
        let now = self.clock.now();
        let incoming: Vec<Variable> = drafts
            .into_iter()
            .map(|draft| transfer::materialize(self.ids.generate(), draft, now))
            .collect();

        let summary = self
            .update(|data| {
                let summary = if merge {
                    transfer::merge_into(&mut data.variables, incoming)
                } else {
                    let summary = ImportSummary {
                        imported: incoming.len(),
                        replaced: 0,
                        appended: incoming.len(),
                    };
                    data.variables = incoming;
                    summary
                };
                Ok(Outcome::Changed(summary))
            })
            .await?;

        info!(
            imported = summary.imported,
            replaced = summary.replaced,
            appended = summary.appended,
            merge,
            "Imported variables"
        );
        Ok(summary)
    }

    /// Serializes variables and settings as a full backup.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub async fn export_data(&self) -> StoreResult<String> {
        let data = self.get_data().await?;
        let document = BackupDocument {
            version: CURRENT_SCHEMA_VERSION.to_string(),
            exported_at: self.clock.now(),
            variables: data.variables,
            settings: data.settings,
        };
        to_pretty_json(&document)
    }

    /// Replaces the document with a full backup.
    ///
    /// Older backups are migrated. Variables are validated as in
    /// [`import_variables`](Self::import_variables) but keep their ids. Settings
    /// are kept when the backup has none. Returns the number of variables
    /// restored.
    ///
    /// # Errors
    ///
    /// A validation error before any write, or a backend error.
    pub async fn import_data(&self, text: &str) -> StoreResult<usize> {
        let restore = transfer::parse_backup(text, self.ids.as_ref(), self.clock.now())
            .inspect_err(|e| warn!(code = %e.code(), "Rejected backup: {e}"))?;
        let count = restore.variables.len();

        self.update(|data| {
            data.version = CURRENT_SCHEMA_VERSION.to_string();
            data.variables = restore.variables;
            if let Some(settings) = restore.settings {
                data.settings = settings;
            }
            Ok(Outcome::Changed(()))
        })
        .await?;

        info!(variables = count, "Restored backup");
        Ok(count)
    }

    /// Reports bytes used and the backend quota.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report its usage.
    pub async fn get_storage_stats(&self) -> StoreResult<StorageStats> {
        Ok(StorageStats {
            bytes_in_use: self.backend.bytes_in_use().await?,
            quota: self.backend.quota_bytes(),
        })
    }

    /// Calls `callback` after every change to this store's storage area.
    ///
    /// The cache is dropped before the callback runs, so reads made from it
    /// see the new document. Changes made through other stores sharing the
    /// backend are delivered too. Must be called inside a tokio runtime.
    pub fn on_changed<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(&StorageChange) + Send + 'static,
    {
        let mut changes = self.backend.subscribe();
        let cache = Arc::clone(&self.cache);
        let area = self.backend.area();

        let handle = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if change.area == area => {
                        cache.invalidate();
                        callback(&change);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Change listener lagged, dropping cache");
                        cache.invalidate();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(handle)
    }
}
