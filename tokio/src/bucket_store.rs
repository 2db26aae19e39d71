//! Per-tag override records grouped into hash buckets on top of a [`SyncStore`].
//!
//! Every operation does exactly one read of the bucket entry and at most one write or remove.
//! The read-modify-write is NOT atomic: the backing store has no compare-and-swap, so if two
//! sessions change different tags in the same bucket at the same time the last full-bucket write
//! wins and the other change is lost.  Callers that need more must serialize writers themselves.

use crate::backing::SyncStore;
use crate::error::BucketError;
use serde_json::Map;
use std::collections::BTreeSet;
use std::sync::Arc;
use tagstore_core::bucket::Bucket;
use tagstore_core::bucket_hash::{bucket_of, BucketId};
use tagstore_core::codec::Decoded;
use tagstore_core::options::HashSettings;
use tracing::{debug, warn};

/// CRUD over tag overrides stored in `tag_<n>` bucket entries.
/// An empty tag is never stored: get returns None and put/delete do nothing, without touching
/// the backing store.
pub struct BucketStore<S: SyncStore + ?Sized> {
    store: Arc<S>,
}

impl<S: SyncStore + ?Sized> Clone for BucketStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: SyncStore + ?Sized> BucketStore<S> {
    /// Create a bucket store over store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Fetch the override for tag, None if there is none.
    pub async fn get(&self, tag: &str) -> Result<Option<Decoded>, BucketError> {
        if tag.is_empty() {
            return Ok(None);
        }
        let bucket = self.load_bucket(bucket_of(tag)).await?;
        bucket.get(tag).map_err(|source| BucketError::Decode {
            tag: tag.to_string(),
            source,
        })
    }

    /// Insert or replace the override for tag with a full snapshot of settings.
    pub async fn put(&self, tag: &str, settings: &HashSettings) -> Result<(), BucketError> {
        if tag.is_empty() {
            return Ok(());
        }
        let mut bucket = self.load_bucket(bucket_of(tag)).await?;
        bucket.insert(tag, settings);
        debug!(tag, bucket = %bucket.id(), tags = bucket.len(), "writing bucket");
        let mut items = Map::new();
        items.insert(bucket.id().key(), bucket.into_value());
        self.store.set(items).await?;
        Ok(())
    }

    /// Remove the override for tag.  Returns false (and writes nothing) if there was none.
    /// A bucket left empty is removed from the store rather than written back.
    pub async fn delete(&self, tag: &str) -> Result<bool, BucketError> {
        if tag.is_empty() {
            return Ok(false);
        }
        let mut bucket = self.load_bucket(bucket_of(tag)).await?;
        if !bucket.remove(tag) {
            return Ok(false);
        }
        let key = bucket.id().key();
        if bucket.is_empty() {
            debug!(tag, bucket = %key, "removing empty bucket");
            self.store.remove(&key).await?;
        } else {
            debug!(tag, bucket = %key, tags = bucket.len(), "writing bucket");
            let mut items = Map::new();
            items.insert(key, bucket.into_value());
            self.store.set(items).await?;
        }
        Ok(true)
    }

    /// Every tag that has an override, sorted.  Reads the whole store once.
    pub async fn list_tags(&self) -> Result<Vec<String>, BucketError> {
        let items = self.store.get(None).await?;
        let mut tags = BTreeSet::new();
        for (key, value) in items {
            let Some(id) = BucketId::parse(&key) else {
                continue;
            };
            match Bucket::from_stored(id, Some(value)) {
                Ok(bucket) => tags.extend(bucket.tags().map(str::to_string)),
                Err(_) => warn!(bucket = %key, "skipping bucket that is not a mapping"),
            }
        }
        Ok(tags.into_iter().collect())
    }

    async fn load_bucket(&self, id: BucketId) -> Result<Bucket, BucketError> {
        let key = id.key();
        let mut items = self.store.get(Some(&key)).await?;
        Bucket::from_stored(id, items.remove(&key))
            .map_err(|_| BucketError::CorruptBucket { bucket: key })
    }
}
