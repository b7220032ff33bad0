use crate::models::{ListError, TodoError};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub mod json;
pub mod memory;
mod migrations;
mod persistence;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod test_utils;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use persistence::{Persistence, LISTS_KEY, SELECTED_LIST_KEY, TODOS_KEY};
pub use sqlite::SqliteStore;

/// Raw failures of a key-value backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage quota exceeded: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { needed: u64, limit: u64 },
    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Stored data failed schema checks. The whole load is rejected.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("`{key}` does not hold the expected structure: {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{key}` record {index} is invalid: {source}")]
    InvalidList {
        key: &'static str,
        index: usize,
        #[source]
        source: ListError,
    },
    #[error("`{key}` record {index} is invalid: {source}")]
    InvalidTodo {
        key: &'static str,
        index: usize,
        #[source]
        source: TodoError,
    },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Failed to read `{key}`: {source}")]
    Read {
        key: &'static str,
        #[source]
        source: BackendError,
    },
}

#[derive(Error, Debug)]
#[error("Failed to write `{key}`: {source}")]
pub struct StorageWriteError {
    pub key: &'static str,
    #[source]
    pub source: BackendError,
}

/// A durable string-to-string store, the shape of browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn set(&self, key: &str, value: &str) -> Result<(), BackendError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), BackendError>;
    /// Drops every entry, even when the existing contents cannot be read.
    fn clear(&self) -> Result<(), BackendError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), BackendError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), BackendError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), BackendError> {
        (**self).clear()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageType {
    #[default]
    Json,
    Sqlite,
}

impl StorageType {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageType::Json => "json",
            StorageType::Sqlite => "sqlite",
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            StorageType::Json => "store.json",
            StorageType::Sqlite => "store.db",
        }
    }
}

impl FromStr for StorageType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(StorageType::Json),
            "sqlite" => Ok(StorageType::Sqlite),
            other => Err(BackendError::Storage(format!(
                "Unknown storage type: {other}"
            ))),
        }
    }
}

pub fn create_backend(
    storage_type: StorageType,
    path: &Path,
    quota_bytes: Option<u64>,
) -> Result<Box<dyn KeyValueStore>, BackendError> {
    match storage_type {
        StorageType::Json => {
            let storage = JsonFileStore::new(path).with_quota(quota_bytes);
            Ok(Box::new(storage))
        }
        StorageType::Sqlite => {
            let storage = SqliteStore::open(path)?.with_quota(quota_bytes);
            Ok(Box::new(storage))
        }
    }
}
