//! Capacity limits enforced by the reference stores.

use crate::error::StorageError;
use serde_json::{Map, Value};

/// Limits of a synchronized store.
/// The defaults are those of the browser sync storage the settings were designed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Quota {
    pub(crate) max_items: usize,
    pub(crate) quota_bytes: usize,
    pub(crate) quota_bytes_per_item: usize,
}

impl Default for Quota {
    fn default() -> Self {
        Self::new()
    }
}

impl Quota {
    /// Create the standard limits: 512 items, 102400 bytes total, 8192 bytes per item.
    pub fn new() -> Self {
        Self {
            max_items: 512,
            quota_bytes: 102_400,
            quota_bytes_per_item: 8_192,
        }
    }

    /// No limits at all.
    pub fn unlimited() -> Self {
        Self {
            max_items: usize::MAX,
            quota_bytes: usize::MAX,
            quota_bytes_per_item: usize::MAX,
        }
    }

    /// Set the cap on distinct top-level keys.
    pub fn set_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Set the total size quota in bytes.
    pub fn set_quota_bytes(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Set the per item size quota in bytes.
    pub fn set_quota_bytes_per_item(mut self, quota_bytes_per_item: usize) -> Self {
        self.quota_bytes_per_item = quota_bytes_per_item;
        self
    }

    /// Cap on distinct top-level keys.
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Total size quota.
    pub fn quota_bytes(&self) -> usize {
        self.quota_bytes
    }

    /// Per item size quota.
    pub fn quota_bytes_per_item(&self) -> usize {
        self.quota_bytes_per_item
    }

    /// Check the items a store would hold after a write.  changed lists the keys being written,
    /// only those are checked against the per item quota.
    pub fn check<'a>(
        &self,
        items: &Map<String, Value>,
        changed: impl IntoIterator<Item = &'a String>,
    ) -> Result<(), StorageError> {
        for key in changed {
            if let Some(value) = items.get(key) {
                let needed = item_size(key, value)?;
                if needed > self.quota_bytes_per_item {
                    return Err(StorageError::QuotaBytesPerItem {
                        key: key.clone(),
                        needed,
                        limit: self.quota_bytes_per_item,
                    });
                }
            }
        }
        if items.len() > self.max_items {
            return Err(StorageError::MaxItems {
                limit: self.max_items,
            });
        }
        let mut needed = 0_usize;
        for (key, value) in items {
            needed = needed.saturating_add(item_size(key, value)?);
        }
        if needed > self.quota_bytes {
            return Err(StorageError::QuotaBytes {
                needed,
                limit: self.quota_bytes,
            });
        }
        Ok(())
    }
}

/// Size an item counts against the quota: key length plus the JSON text of the value.
pub fn item_size(key: &str, value: &Value) -> Result<usize, serde_json::Error> {
    Ok(key.len() + serde_json::to_string(value)?.len())
}
