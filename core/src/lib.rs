#![deny(missing_docs)]

//! Synchronous core of a per-site settings store.
//!
//! Global defaults are kept in one entry of a small synchronized key/value store.  Per-site (tag)
//! overrides are packed into a fixed set of buckets so any number of tags fits under the store's
//! cap on top-level keys: a tag is hashed to one of 419 buckets and each bucket entry maps tag to
//! a compact `{"f": flags, "l": length}` record.
//!
//! This crate contains the pieces that do no I/O: the bucket hash, the option model, the record
//! codec and the bucket container.  See the `tagstore_tokio` crate for the async store.

pub mod bucket;
pub mod bucket_hash;
pub mod codec;
pub mod error;
pub mod options;
pub mod store_config;
