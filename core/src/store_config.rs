//! Define the configuration used to build a settings store.

/// Key of the defaults entry in the synchronized store.
pub const DEFAULT_OPTIONS_KEY: &str = "options";
/// Key of the cached secret in the secret cache.
pub const DEFAULT_SECRET_KEY: &str = "masterpassword";

/// Names of the entries used in the backing stores.
/// Bucket keys are fixed (`tag_<n>`) and are not part of the config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub(crate) options_key: String,
    pub(crate) secret_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreConfig {
    /// Create a new config with the standard key names.
    pub fn new() -> Self {
        Self {
            options_key: DEFAULT_OPTIONS_KEY.to_string(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
        }
    }

    /// Set the key the global defaults are stored under.
    /// Panics if the key could be mistaken for a bucket.
    pub fn set_options_key<S: Into<String>>(mut self, key: S) -> Self {
        let key = key.into();
        if crate::bucket_hash::BucketId::parse(&key).is_some() {
            panic!("Invalid options key {}, collides with a bucket key", key);
        }
        self.options_key = key;
        self
    }

    /// Set the key the cached secret is stored under.
    pub fn set_secret_key<S: Into<String>>(mut self, key: S) -> Self {
        self.secret_key = key.into();
        self
    }

    /// Key of the defaults entry.
    pub fn options_key(&self) -> &str {
        &self.options_key
    }

    /// Key of the cached secret.
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = StoreConfig::new();
        assert_eq!(config.options_key(), "options");
        assert_eq!(config.secret_key(), "masterpassword");
        let config = config.set_options_key("defaults").set_secret_key("secret");
        assert_eq!(config.options_key(), "defaults");
        assert_eq!(config.secret_key(), "secret");
    }

    #[test]
    #[should_panic]
    fn test_bucket_key_rejected() {
        let _ = StoreConfig::new().set_options_key("tag_12");
    }
}
