//! Interfaces of the external stores the settings layer is built on.

use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A small synchronized key/value store.
/// Real implementations cap both the number of top-level keys and their total size, every call
/// completes or fails on its own (there is no transaction across calls).
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Fetch key, or every entry if key is None.  A missing key is simply absent from the result.
    async fn get(&self, key: Option<&str>) -> Result<Map<String, Value>, StorageError>;

    /// Write every entry in items, replacing existing values.
    async fn set(&self, items: Map<String, Value>) -> Result<(), StorageError>;

    /// Remove key, removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// A local, unsynchronized store that holds at most a cached secret.
#[async_trait]
pub trait SecretCache: Send + Sync {
    /// Fetch the value at key.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store value at key.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove key, removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
