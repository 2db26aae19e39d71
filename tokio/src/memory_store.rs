//! In-memory reference implementations of the backing stores.

use crate::backing::{SecretCache, SyncStore};
use crate::error::StorageError;
use crate::quota::Quota;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counts of the calls made against a store.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OpStats {
    /// get() calls.
    pub reads: usize,
    /// set() calls.
    pub writes: usize,
    /// remove() calls.
    pub removes: usize,
}

/// A synchronized store kept in memory that enforces a [`Quota`] like the real thing.
/// A rejected write leaves the store unchanged.
pub struct MemoryStore {
    // Never held across an await so a sync mutex is fine.
    items: parking_lot::Mutex<Map<String, Value>>,
    quota: Quota,
    reads: AtomicUsize,
    writes: AtomicUsize,
    removes: AtomicUsize,
    unavailable: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Quota::default())
    }
}

impl MemoryStore {
    /// Create an empty store with quota.
    pub fn new(quota: Quota) -> Self {
        Self {
            items: parking_lot::Mutex::new(Map::new()),
            quota,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Put an item directly, bypassing quota and stats.  For seeding old data.
    pub fn insert_raw<K: Into<String>>(&self, key: K, value: Value) {
        self.items.lock().insert(key.into(), value);
    }

    /// Copy of everything in the store.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.items.lock().clone()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Is the store empty?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls made so far.
    pub fn stats(&self) -> OpStats {
        OpStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }

    /// Make every following call fail with [`StorageError::Unavailable`] (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(StorageError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn get(&self, key: Option<&str>) -> Result<Map<String, Value>, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let items = self.items.lock();
        Ok(match key {
            None => items.clone(),
            Some(key) => items
                .get(key)
                .map(|v| (key.to_string(), v.clone()))
                .into_iter()
                .collect(),
        })
    }

    async fn set(&self, new_items: Map<String, Value>) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        let mut items = self.items.lock();
        let mut candidate = items.clone();
        let changed: Vec<String> = new_items.keys().cloned().collect();
        candidate.extend(new_items);
        self.quota.check(&candidate, &changed)?;
        *items = candidate;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.removes.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Secret cache kept in memory.
#[derive(Default)]
pub struct MemorySecretCache {
    secrets: DashMap<String, String>,
}

impl MemorySecretCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if something is cached at key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.secrets.contains_key(key)
    }
}

#[async_trait]
impl SecretCache for MemorySecretCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.secrets.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.secrets.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.secrets.remove(key);
        Ok(())
    }
}
