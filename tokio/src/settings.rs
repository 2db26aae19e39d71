//! The two tier settings view: global defaults plus the override of the active tag.

use crate::backing::{SecretCache, SyncStore};
use crate::bucket_store::BucketStore;
use crate::error::{BucketError, SettingsError};
use serde_json::{Map, Value};
use std::sync::Arc;
use tagstore_core::options::{Options, StorePass};
use tagstore_core::store_config::StoreConfig;
use tracing::{debug, info, warn};

/// What save_tag_specific() did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Empty tag, nothing read or written.
    Skipped,
    /// The override was written.
    Saved,
    /// Settings match the defaults and the stored override was removed.
    Deleted,
    /// Settings match the defaults and there was no override to remove.
    Unchanged,
}

/// Holds the global defaults and the active (defaults plus tag override) options for one session.
/// There is a single owner, all mutating calls take &mut self.
pub struct SettingsContext<S, C>
where
    S: SyncStore + ?Sized,
    C: SecretCache + ?Sized,
{
    config: StoreConfig,
    buckets: BucketStore<S>,
    secrets: Arc<C>,
    defaults: Options,
    active: Options,
}

impl<S, C> SettingsContext<S, C>
where
    S: SyncStore + ?Sized,
    C: SecretCache + ?Sized,
{
    /// Create a context with the built in defaults.  Call load_defaults() to read stored ones.
    pub fn new(config: StoreConfig, store: Arc<S>, secrets: Arc<C>) -> Self {
        let defaults = Options::new();
        Self {
            config,
            buckets: BucketStore::new(store),
            secrets,
            active: defaults.clone(),
            defaults,
        }
    }

    /// Current global defaults.
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Active options (defaults overlaid with the loaded tag's override).
    pub fn active(&self) -> &Options {
        &self.active
    }

    /// Mutable active options, changes are persisted by save_tag_specific().
    pub fn active_mut(&mut self) -> &mut Options {
        &mut self.active
    }

    /// The bucket store used for tag overrides.
    pub fn buckets(&self) -> &BucketStore<S> {
        &self.buckets
    }

    /// Read the stored defaults over the built in template and reset the active options to them.
    /// Unknown stored options are dropped.  A legacy or unreadable entry is written back once in
    /// the current form.
    pub async fn load_defaults(&mut self) -> Result<&Options, SettingsError> {
        let key = self.config.options_key();
        let mut items = self.buckets.store().get(Some(key)).await?;
        let (stored, malformed) = match items.remove(key) {
            Some(Value::Object(stored)) => (stored, false),
            Some(other) => {
                warn!(%other, "stored defaults are not a mapping, using built in defaults");
                (Map::new(), true)
            }
            None => (Map::new(), false),
        };
        let (defaults, overlay) = Options::from_stored(&stored);
        if overlay.rewrite || malformed {
            info!("upgrading stored defaults");
            self.write_defaults(&defaults).await?;
        }
        self.active = defaults.clone();
        self.defaults = defaults;
        Ok(&self.defaults)
    }

    /// Persist current as the global defaults.
    /// Unless the policy keeps the secret forever the cached secret is purged at once.
    pub async fn save_defaults(&mut self, current: Options) -> Result<(), SettingsError> {
        self.write_defaults(&current).await?;
        // Track what was written even if the purge below fails.
        self.defaults = current;
        if self.defaults.store_pass != StorePass::Forever {
            debug!("clearing cached secret");
            self.secrets.remove(self.config.secret_key()).await?;
        }
        Ok(())
    }

    /// Reset the active options to the defaults then apply the stored override for tag, if any.
    /// An empty tag reads nothing.  A record that can not be decoded is ignored, a legacy record
    /// is rewritten once in the current form.
    pub async fn load_tag(&mut self, tag: &str) -> Result<&Options, SettingsError> {
        self.active = self.defaults.clone();
        if tag.is_empty() {
            return Ok(&self.active);
        }
        match self.buckets.get(tag).await {
            Ok(Some(decoded)) => {
                self.active.hash = decoded.settings;
                if decoded.legacy {
                    info!(tag, "upgrading legacy override");
                    self.buckets.put(tag, &decoded.settings).await?;
                }
            }
            Ok(None) => {}
            Err(err @ (BucketError::Decode { .. } | BucketError::CorruptBucket { .. })) => {
                warn!(%err, "ignoring stored override");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(&self.active)
    }

    /// Persist the active options as the override of tag.
    /// With only_if_changed, settings equal to the defaults remove any stored override instead.
    /// The stored record is always a full snapshot so later default changes do not leak into it.
    pub async fn save_tag_specific(
        &self,
        tag: &str,
        only_if_changed: bool,
    ) -> Result<SaveOutcome, SettingsError> {
        if tag.is_empty() {
            debug!("no tag, nothing to save");
            return Ok(SaveOutcome::Skipped);
        }
        let changed = self.active.hash.changed_fields(&self.defaults.hash);
        if only_if_changed && changed.is_empty() {
            return Ok(if self.buckets.delete(tag).await? {
                debug!(tag, "override matches defaults, removed");
                SaveOutcome::Deleted
            } else {
                SaveOutcome::Unchanged
            });
        }
        debug!(tag, ?changed, "saving override");
        self.buckets.put(tag, &self.active.hash).await?;
        Ok(SaveOutcome::Saved)
    }

    /// Stash secret in the secret cache if the defaults keep it forever.
    /// Returns true if it was stored.
    pub async fn remember_secret(&self, secret: &str) -> Result<bool, SettingsError> {
        if self.defaults.store_pass != StorePass::Forever {
            return Ok(false);
        }
        self.secrets
            .set(self.config.secret_key(), secret.to_string())
            .await?;
        Ok(true)
    }

    /// The cached secret, if any.
    pub async fn cached_secret(&self) -> Result<Option<String>, SettingsError> {
        Ok(self.secrets.get(self.config.secret_key()).await?)
    }

    async fn write_defaults(&self, options: &Options) -> Result<(), SettingsError> {
        let mut items = Map::new();
        items.insert(self.config.options_key().to_string(), options.to_value()?);
        self.buckets.store().set(items).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::memory_store::{MemorySecretCache, MemoryStore, OpStats};
    use serde_json::json;
    use tagstore_core::options::GuessTag;

    type TestContext = SettingsContext<MemoryStore, MemorySecretCache>;

    fn setup() -> (Arc<MemoryStore>, Arc<MemorySecretCache>, TestContext) {
        let store = Arc::new(MemoryStore::default());
        let secrets = Arc::new(MemorySecretCache::new());
        let context = SettingsContext::new(StoreConfig::new(), store.clone(), secrets.clone());
        (store, secrets, context)
    }

    #[tokio::test]
    async fn test_bank_scenario() {
        let (store, _secrets, mut context) = setup();
        context.load_defaults().await.unwrap();
        assert_eq!(context.defaults(), &Options::new());

        let active = context.load_tag("bank").await.unwrap();
        assert_eq!(active, &Options::new());

        context.active_mut().hash.length = 12;
        assert_eq!(
            context.save_tag_specific("bank", true).await.unwrap(),
            SaveOutcome::Saved
        );
        assert_eq!(
            store.snapshot().get("tag_290"),
            Some(&json!({"bank": {"f": "dpm", "l": 12}}))
        );

        let active = context.load_tag("bank").await.unwrap().clone();
        assert_eq!(active.hash.length, 12);
        assert!(active.hash.digits && active.hash.punctuation && active.hash.mixed_case);
        assert!(!active.hash.no_special && !active.hash.digits_only);

        context.active_mut().hash.length = 8;
        assert_eq!(
            context.save_tag_specific("bank", true).await.unwrap(),
            SaveOutcome::Deleted
        );
        assert!(!store.snapshot().contains_key("tag_290"));
        assert_eq!(context.load_tag("bank").await.unwrap(), &Options::new());
    }

    #[tokio::test]
    async fn test_save_idempotent() {
        let (store, _secrets, mut context) = setup();
        context.load_tag("example.com").await.unwrap();
        context.active_mut().hash.no_special = true;
        context.save_tag_specific("example.com", true).await.unwrap();
        let once = store.snapshot();
        context.save_tag_specific("example.com", true).await.unwrap();
        assert_eq!(store.snapshot(), once);
        assert_eq!(
            once.get("tag_128"),
            Some(&json!({"example.com": {"f": "dpmr", "l": 8}}))
        );
    }

    #[tokio::test]
    async fn test_revert_keeps_shared_bucket() {
        let (store, _secrets, mut context) = setup();
        for tag in ["github.com", "😀"] {
            context.load_tag(tag).await.unwrap();
            context.active_mut().hash.digits = false;
            context.save_tag_specific(tag, true).await.unwrap();
        }
        context.load_tag("github.com").await.unwrap();
        context.active_mut().hash.digits = true;
        assert_eq!(
            context.save_tag_specific("github.com", true).await.unwrap(),
            SaveOutcome::Deleted
        );
        assert_eq!(
            store.snapshot().get("tag_110"),
            Some(&json!({"😀": {"f": "pm", "l": 8}}))
        );
    }

    #[tokio::test]
    async fn test_unchanged_without_override() {
        let (store, _secrets, mut context) = setup();
        context.load_tag("bank").await.unwrap();
        assert_eq!(
            context.save_tag_specific("bank", true).await.unwrap(),
            SaveOutcome::Unchanged
        );
        assert!(store.is_empty());
        assert_eq!(store.stats().writes, 0);
        assert_eq!(store.stats().removes, 0);
    }

    #[tokio::test]
    async fn test_full_snapshot_when_forced() {
        let (store, _secrets, mut context) = setup();
        context.load_tag("bank").await.unwrap();
        assert_eq!(
            context.save_tag_specific("bank", false).await.unwrap(),
            SaveOutcome::Saved
        );
        assert_eq!(
            store.snapshot().get("tag_290"),
            Some(&json!({"bank": {"f": "dpm", "l": 8}}))
        );

        // Defaults change later, the saved snapshot keeps its own values.
        let mut defaults = context.defaults().clone();
        defaults.hash.length = 20;
        context.save_defaults(defaults).await.unwrap();
        assert_eq!(context.load_tag("bank").await.unwrap().hash.length, 8);
    }

    #[tokio::test]
    async fn test_empty_tag_no_op() {
        let (store, _secrets, mut context) = setup();
        context.active_mut().hash.length = 30;
        assert_eq!(
            context.save_tag_specific("", true).await.unwrap(),
            SaveOutcome::Skipped
        );
        assert_eq!(
            context.save_tag_specific("", false).await.unwrap(),
            SaveOutcome::Skipped
        );
        assert_eq!(context.load_tag("").await.unwrap(), &Options::new());
        assert_eq!(store.stats(), OpStats::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_override_rewritten_once() {
        let (store, _secrets, mut context) = setup();
        store.insert_raw("tag_290", json!({"bank": {"f": "dm", "l": "12"}}));

        let active = context.load_tag("bank").await.unwrap();
        assert_eq!(active.hash.length, 12);
        assert!(!active.hash.punctuation);
        assert_eq!(store.stats().writes, 1);
        assert_eq!(
            store.snapshot().get("tag_290"),
            Some(&json!({"bank": {"f": "dm", "l": 12}}))
        );

        context.load_tag("bank").await.unwrap();
        assert_eq!(store.stats().writes, 1);
    }

    #[tokio::test]
    async fn test_load_defaults() {
        let (store, _secrets, mut context) = setup();
        store.insert_raw(
            "options",
            json!({"length": 10, "guesstag": "full", "displayhash": true, "removed": "x"}),
        );
        let defaults = context.load_defaults().await.unwrap().clone();
        assert_eq!(defaults.hash.length, 10);
        assert_eq!(defaults.guess_tag, GuessTag::Full);
        assert!(defaults.display_hash);
        assert!(defaults.display_tag);
        assert_eq!(context.active(), &defaults);
        // Dropping an unknown option does not force a write.
        assert_eq!(store.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_legacy_defaults_rewritten() {
        let (store, _secrets, mut context) = setup();
        store.insert_raw("options", json!({"length": "12", "digits": false}));
        context.load_defaults().await.unwrap();
        assert_eq!(context.defaults().hash.length, 12);
        assert_eq!(store.stats().writes, 1);
        let stored = &store.snapshot()["options"];
        assert_eq!(stored["length"], json!(12));
        assert_eq!(stored["digits"], json!(false));
        assert_eq!(stored["storepass"], json!("never"));

        context.load_defaults().await.unwrap();
        assert_eq!(store.stats().writes, 1);
    }

    #[tokio::test]
    async fn test_override_tracks_current_defaults() {
        let (store, _secrets, mut context) = setup();
        store.insert_raw("options", json!({"length": 12}));
        context.load_defaults().await.unwrap();
        context.load_tag("bank").await.unwrap();
        // Equal to the (stored) defaults: nothing to save.
        assert_eq!(
            context.save_tag_specific("bank", true).await.unwrap(),
            SaveOutcome::Unchanged
        );
        context.active_mut().hash.length = 8;
        assert_eq!(
            context.save_tag_specific("bank", true).await.unwrap(),
            SaveOutcome::Saved
        );
    }

    #[tokio::test]
    async fn test_secret_policy() {
        let (_store, secrets, mut context) = setup();
        assert!(!context.remember_secret("hunter2").await.unwrap());
        assert_eq!(context.cached_secret().await.unwrap(), None);

        let mut defaults = context.defaults().clone();
        defaults.store_pass = StorePass::Forever;
        context.save_defaults(defaults.clone()).await.unwrap();
        assert!(context.remember_secret("hunter2").await.unwrap());
        assert_eq!(
            context.cached_secret().await.unwrap(),
            Some("hunter2".to_string())
        );

        defaults.store_pass = StorePass::Never;
        context.save_defaults(defaults).await.unwrap();
        assert!(!secrets.contains_key("masterpassword"));
        assert_eq!(context.cached_secret().await.unwrap(), None);
    }

    /// Secret cache whose remove always fails.
    struct StuckSecretCache {
        inner: MemorySecretCache,
    }

    #[async_trait::async_trait]
    impl SecretCache for StuckSecretCache {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("secret cache locked".to_string()))
        }
    }

    #[tokio::test]
    async fn test_policy_kept_when_purge_fails() {
        let store = Arc::new(MemoryStore::default());
        let secrets = Arc::new(StuckSecretCache {
            inner: MemorySecretCache::new(),
        });
        let mut context = SettingsContext::new(StoreConfig::new(), store.clone(), secrets);

        let mut defaults = context.defaults().clone();
        defaults.store_pass = StorePass::Forever;
        context.save_defaults(defaults.clone()).await.unwrap();

        defaults.store_pass = StorePass::Never;
        assert!(matches!(
            context.save_defaults(defaults).await,
            Err(SettingsError::Storage(StorageError::Unavailable(_)))
        ));
        assert_eq!(store.snapshot()["options"]["storepass"], json!("never"));
        assert_eq!(context.defaults().store_pass, StorePass::Never);
        assert!(!context.remember_secret("hunter2").await.unwrap());
        assert_eq!(context.cached_secret().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_override_ignored() {
        let (store, _secrets, mut context) = setup();
        store.insert_raw("tag_290", json!({"bank": {"l": 12}}));
        assert_eq!(context.load_tag("bank").await.unwrap(), &Options::new());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let (store, _secrets, mut context) = setup();
        context.load_tag("bank").await.unwrap();
        context.active_mut().hash.length = 12;
        store.set_unavailable(true);
        assert!(matches!(
            context.save_tag_specific("bank", true).await,
            Err(SettingsError::Bucket(BucketError::Storage(
                StorageError::Unavailable(_)
            )))
        ));
        assert!(matches!(
            context.load_tag("bank").await,
            Err(SettingsError::Bucket(_))
        ));
        let defaults = context.defaults().clone();
        let mut changed = defaults.clone();
        changed.hash.length = 40;
        assert!(matches!(
            context.save_defaults(changed).await,
            Err(SettingsError::Storage(StorageError::Unavailable(_)))
        ));
        assert_eq!(context.defaults(), &defaults);
        store.set_unavailable(false);
        assert!(store.is_empty());
    }
}
