//! Snapshot persistence over a string-keyed store.
//!
//! Stores never talk to a storage medium directly. They hold a [`Persistence`]
//! handle wrapping any [`KeyValueStore`], which is how tests swap the SQLite
//! database for [`MemoryStore`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::database::DatabaseError;

pub const TASKS_KEY: &str = "taskflow_tasks";
pub const LISTS_KEY: &str = "taskflow_lists";
/// Session record written by the sign-in flow; stores never touch it.
pub const USER_KEY: &str = "taskflow_user";

/// Suffix for the key holding a snapshot that failed to parse.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Stored data under '{key}' is corrupt: {source}")]
    CorruptData {
        key: String,
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize snapshot for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Durable string-keyed store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local store, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stateless gateway between in-memory collections and a [`KeyValueStore`].
///
/// Cloning is cheap; every clone writes to the same backend.
#[derive(Clone)]
pub struct Persistence {
    backend: Arc<dyn KeyValueStore>,
}

impl Persistence {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Persistence over a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Serialize `items` as a JSON array and overwrite whatever is under `key`
    pub fn save<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), PersistError> {
        let json = serde_json::to_string(items).map_err(|source| PersistError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &json)?;
        debug!(key, count = items.len(), "snapshot saved");
        Ok(())
    }

    /// Read the snapshot under `key`; `Ok(None)` if it was never written
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>, PersistError> {
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => Ok(Some(items)),
            Err(source) => Err(PersistError::CorruptData {
                key: key.to_string(),
                raw,
                source,
            }),
        }
    }

    /// Copy an unreadable blob aside so a reseed does not destroy it
    pub fn preserve_corrupt(&self, key: &str, raw: &str) -> Result<(), PersistError> {
        let backup_key = format!("{}{}", key, CORRUPT_SUFFIX);
        self.backend.set(&backup_key, raw)?;
        Ok(())
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence").finish_non_exhaustive()
    }
}
