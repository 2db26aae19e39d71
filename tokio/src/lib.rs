#![deny(missing_docs)]

//! Async settings store over a small synchronized key/value store.  This is tokio flavored (the
//! file store and the tests) but the store traits are runtime agnostic.
//!
//! The pieces, leaves first:
//! - [`backing`]: the interfaces of the external stores ([`SyncStore`], [`SecretCache`]).
//! - [`memory_store`] and [`file_store`]: reference stores that enforce a [`Quota`].
//! - [`bucket_store`]: tag overrides packed into `tag_<n>` bucket entries.
//! - [`settings`]: global defaults plus the active tag's override, with the save protocol.

pub mod backing;
pub mod bucket_store;
pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod quota;
pub mod settings;

pub use backing::{SecretCache, SyncStore};
pub use bucket_store::BucketStore;
pub use error::{BucketError, SettingsError, StorageError};
pub use file_store::FileStore;
pub use memory_store::{MemorySecretCache, MemoryStore, OpStats};
pub use quota::Quota;
pub use settings::{SaveOutcome, SettingsContext};
