//! In-memory form of one bucket entry: the tag to override record mapping stored under `tag_<n>`.

use crate::bucket_hash::{bucket_of, BucketId};
use crate::codec::{decode_opt, encode, Decoded};
use crate::error::DecodeError;
use crate::options::HashSettings;
use serde_json::{Map, Value};

/// The records of every tag that hashes into one bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    id: BucketId,
    entries: Map<String, Value>,
}

impl Bucket {
    /// Create an empty bucket.
    pub fn new(id: BucketId) -> Self {
        Self {
            id,
            entries: Map::new(),
        }
    }

    /// Build a bucket from its stored value (None if the bucket key does not exist).
    /// Returns the stored value back as Err if it is not a mapping.
    pub fn from_stored(id: BucketId, stored: Option<Value>) -> Result<Self, Value> {
        match stored {
            None => Ok(Self::new(id)),
            Some(Value::Object(entries)) => Ok(Self { id, entries }),
            Some(other) => Err(other),
        }
    }

    /// Bucket identifier.
    pub fn id(&self) -> BucketId {
        self.id
    }

    /// Number of tags in the bucket.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no tag is stored, an empty bucket must not be written back.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if tag has a record here.
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Tags in this bucket.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Decode the record for tag.
    pub fn get(&self, tag: &str) -> Result<Option<Decoded>, DecodeError> {
        decode_opt(self.entries.get(tag))
    }

    /// Insert or replace the record for tag.
    pub fn insert(&mut self, tag: &str, settings: &HashSettings) {
        debug_assert_eq!(bucket_of(tag), self.id, "tag {} in wrong bucket", tag);
        self.entries.insert(tag.to_string(), encode(settings));
    }

    /// Remove the record for tag, returns true if it was present.
    pub fn remove(&mut self, tag: &str) -> bool {
        self.entries.remove(tag).is_some()
    }

    /// Consume the bucket into the value stored under its key.
    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }
}
