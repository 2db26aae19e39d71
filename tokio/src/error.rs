//! Errors for the async store, one per layer.

use std::io;
use std::path::PathBuf;
use tagstore_core::error::DecodeError;
use thiserror::Error;

/// Error from a backing store (the synchronized store or the secret cache).
/// These are always surfaced to the caller, nothing in this crate retries them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the cap on distinct top-level keys.
    #[error("max items exceeded (limit {limit})")]
    MaxItems {
        /// Configured cap.
        limit: usize,
    },
    /// The write would exceed the total size quota.
    #[error("quota exceeded: {needed} bytes (limit {limit})")]
    QuotaBytes {
        /// Size the store would have after the write.
        needed: usize,
        /// Configured quota.
        limit: usize,
    },
    /// One item would exceed the per item quota.
    #[error("item {key} exceeds per item quota: {needed} bytes (limit {limit})")]
    QuotaBytesPerItem {
        /// Offending key.
        key: String,
        /// Size of the item.
        needed: usize,
        /// Configured quota.
        limit: usize,
    },
    /// The store can not be reached right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A file backed store did not contain a JSON object.
    #[error("store file {0} does not hold a JSON object")]
    InvalidFile(PathBuf),
    /// Underlying IO error.
    #[error("io: {0}")]
    IO(#[from] io::Error),
    /// Failed to (de)serialize stored data.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error from a bucket operation.
#[derive(Debug, Error)]
pub enum BucketError {
    /// The backing store failed.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    /// A bucket key holds something other than a mapping, it is left untouched.
    #[error("bucket {bucket} is not a mapping")]
    CorruptBucket {
        /// Bucket key.
        bucket: String,
    },
    /// The record for a tag could not be decoded.
    #[error("record for {tag}: {source}")]
    Decode {
        /// Tag whose record is bad.
        tag: String,
        /// Decode failure.
        source: DecodeError,
    },
}

/// Error from a settings context operation.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backing store failed.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    /// A bucket operation failed.
    #[error("bucket: {0}")]
    Bucket(#[from] BucketError),
    /// The defaults could not be serialized.
    #[error("encode defaults: {0}")]
    Encode(#[from] serde_json::Error),
}
