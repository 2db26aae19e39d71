//! A synchronized store backed by one JSON file.  Every write replaces the file through a
//! temporary file and a rename so a crash leaves either the old or the new contents.

use crate::backing::SyncStore;
use crate::error::StorageError;
use crate::quota::Quota;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// File backed [`SyncStore`] that enforces a [`Quota`].
pub struct FileStore {
    path: PathBuf,
    quota: Quota,
    // Held across the file write so writers are serialized.
    items: Mutex<Map<String, Value>>,
}

impl FileStore {
    /// Open the store at path, a missing file is an empty store.
    pub async fn open<P: Into<PathBuf>>(path: P, quota: Quota) -> Result<Self, StorageError> {
        let path = path.into();
        let items = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(items) => items,
                _ => return Err(StorageError::InvalidFile(path)),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), items = items.len(), "opened file store");
        Ok(Self {
            path,
            quota,
            items: Mutex::new(items),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, items: &Map<String, Value>) -> Result<(), StorageError> {
        let tmp = tmp_path(&self.path);
        tokio::fs::write(&tmp, serde_json::to_vec(items)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Sibling of path with ".tmp" appended to the full file name.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[async_trait]
impl SyncStore for FileStore {
    async fn get(&self, key: Option<&str>) -> Result<Map<String, Value>, StorageError> {
        let items = self.items.lock().await;
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
        let mut items = self.items.lock().await;
        let mut candidate = items.clone();
        let changed: Vec<String> = new_items.keys().cloned().collect();
        candidate.extend(new_items);
        self.quota.check(&candidate, &changed)?;
        self.persist(&candidate).await?;
        *items = candidate;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().await;
        if items.contains_key(key) {
            let mut candidate = items.clone();
            candidate.remove(key);
            self.persist(&candidate).await?;
            *items = candidate;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn items(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");
        {
            let store = FileStore::open(&path, Quota::default()).await.unwrap();
            assert!(store.get(None).await.unwrap().is_empty());
            let seed = json!({"options": {"length": 10}, "tag_1": {"x": {"f": "", "l": 3}}});
            store.set(items(seed)).await.unwrap();
            store.remove("tag_1").await.unwrap();
            store.remove("tag_1").await.unwrap();
        }
        let store = FileStore::open(&path, Quota::default()).await.unwrap();
        assert_eq!(store.path(), path.as_path());
        assert_eq!(
            store.get(None).await.unwrap(),
            items(json!({"options": {"length": 10}}))
        );
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_tmp_path_keeps_file_name() {
        let dir = Path::new("/data");
        assert_eq!(tmp_path(&dir.join("a.json")), dir.join("a.json.tmp"));
        assert_ne!(tmp_path(&dir.join("a.json")), tmp_path(&dir.join("a.txt")));
        assert_eq!(tmp_path(&dir.join("sync.tmp")), dir.join("sync.tmp.tmp"));
    }

    #[tokio::test]
    async fn test_store_named_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.tmp");
        {
            let store = FileStore::open(&path, Quota::default()).await.unwrap();
            store
                .set(items(json!({"options": {"length": 9}})))
                .await
                .unwrap();
        }
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
        let store = FileStore::open(&path, Quota::default()).await.unwrap();
        assert_eq!(
            store.get(None).await.unwrap(),
            items(json!({"options": {"length": 9}}))
        );
    }

    #[tokio::test]
    async fn test_quota_rejects_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");
        let store = FileStore::open(&path, Quota::new().set_quota_bytes_per_item(10))
            .await
            .unwrap();
        let err = store
            .set(items(json!({"options": "far too long for the quota"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaBytesPerItem { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");
        std::fs::write(&path, b"[1, 2, 3]").unwrap();
        assert!(matches!(
            FileStore::open(&path, Quota::default()).await,
            Err(StorageError::InvalidFile(_))
        ));
    }
}
