//! Per-record-type n-gram configuration.
//!
//! The query side needs the same [`NgramConfig`] the write side used, but only knows the
//! record type. Entries are filled once per type and never invalidated.

use crate::error::{Result, SearchError};
use crate::ngram::NgramConfig;
use crate::record::StaticSearchConfig;
use mini_moka::sync::Cache;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tracing::debug;

static GLOBAL: LazyLock<ConfigCache> = LazyLock::new(ConfigCache::new);

/// Concurrent record type → [`NgramConfig`] map.
///
/// Lookups are lock-free. Inserts go through one mutex so that the first configuration
/// stored for a type is the one every caller sees. Cloning is cheap and clones share
/// entries.
#[derive(Clone)]
pub struct ConfigCache {
    configs: Cache<String, NgramConfig>,
    inserts: Arc<Mutex<()>>,
}

impl ConfigCache {
    /// Unbounded cache without expiry.
    pub fn new() -> Self {
        Self {
            configs: Cache::builder().build(),
            inserts: Arc::new(Mutex::new(())),
        }
    }

    /// Process-wide instance.
    pub fn global() -> &'static ConfigCache {
        &GLOBAL
    }

    /// Configuration of a statically known record type.
    pub fn get<R: StaticSearchConfig>(&self) -> NgramConfig {
        let key = R::RECORD_TYPE.to_string();
        if let Some(config) = self.configs.get(&key) {
            return config;
        }

        debug!("Caching n-gram config for [{}]", R::RECORD_TYPE);
        self.insert_if_absent(key, R::NGRAM_CONFIG)
    }

    /// Register a record type known only at runtime.
    ///
    /// Registering the same configuration again is a no-op; a different one is an error,
    /// since a type's configuration must not change while records are indexed with it.
    pub fn register(&self, record_type: &str, config: NgramConfig) -> Result<()> {
        if record_type.trim().is_empty() {
            return Err(SearchError::config("record type name must not be blank"));
        }

        let stored = self.insert_if_absent(record_type.to_string(), config);
        if stored == config {
            debug!("Registered n-gram config for [{}]: {:?}", record_type, config);
            Ok(())
        } else {
            Err(SearchError::config(format!(
                "record type [{}] already registered with {:?}, refusing {:?}",
                record_type, stored, config
            )))
        }
    }

    /// Store `config` unless `key` already has one; returns the stored configuration.
    fn insert_if_absent(&self, key: String, config: NgramConfig) -> NgramConfig {
        // the guard protects no data, so a poisoned lock is still usable
        let _guard = self.inserts.lock().unwrap_or_else(PoisonError::into_inner);
        match self.configs.get(&key) {
            Some(existing) => existing,
            None => {
                self.configs.insert(key, config);
                config
            }
        }
    }

    /// Configuration of a registered record type.
    pub fn get_registered(&self, record_type: &str) -> Result<NgramConfig> {
        self.configs
            .get(&record_type.to_string())
            .ok_or_else(|| SearchError::UnknownRecordType {
                record_type: record_type.to_string(),
            })
    }

    pub fn contains(&self, record_type: &str) -> bool {
        self.configs.get(&record_type.to_string()).is_some()
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::NgramMode;
    use std::thread;

    struct Article;

    impl StaticSearchConfig for Article {
        const RECORD_TYPE: &'static str = "article";
        const NGRAM_CONFIG: NgramConfig = NgramConfig::of(NgramMode::Words, 2, 8);
    }

    struct Comment;

    impl StaticSearchConfig for Comment {
        const RECORD_TYPE: &'static str = "comment";
        const NGRAM_CONFIG: NgramConfig = NgramConfig::DEFAULT;
    }

    #[test]
    fn test_static_config_is_cached_per_type() {
        let cache = ConfigCache::new();
        assert_eq!(cache.get::<Article>(), Article::NGRAM_CONFIG);
        assert_eq!(cache.get::<Comment>(), NgramConfig::DEFAULT);
        assert!(cache.contains("article"));
        assert_eq!(cache.get_registered("article").unwrap(), Article::NGRAM_CONFIG);
    }

    #[test]
    fn test_unknown_type_is_a_config_error() {
        let err = ConfigCache::new().get_registered("nope").unwrap_err();
        assert!(matches!(err, SearchError::UnknownRecordType { .. }));
        assert_eq!(err.to_rpc_error_code(), -32010);
    }

    #[test]
    fn test_register_is_idempotent_but_immutable() {
        let cache = ConfigCache::new();
        let config = NgramConfig::of(NgramMode::Characters, 3, 4);
        cache.register("note", config).unwrap();
        cache.register("note", config).unwrap();
        assert!(cache.register("note", NgramConfig::DEFAULT).is_err());
        assert!(cache.register(" ", NgramConfig::DEFAULT).is_err());
        assert_eq!(cache.get_registered("note").unwrap(), config);
    }

    #[test]
    fn test_concurrent_population() {
        let cache = Arc::new(ConfigCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get::<Article>())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Article::NGRAM_CONFIG);
        }
        assert_eq!(cache.get_registered("article").unwrap(), Article::NGRAM_CONFIG);
    }

    #[test]
    fn test_concurrent_conflicting_registrations_keep_one() {
        let cache = Arc::new(ConfigCache::new());
        let handles: Vec<_> = (1..=16)
            .map(|min| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let config = NgramConfig::of(NgramMode::Characters, min, 20);
                    cache.register("race", config).map(|_| config)
                })
            })
            .collect();

        let winners: Vec<NgramConfig> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap().ok())
            .collect();
        assert_eq!(winners.len(), 1);
        assert_eq!(cache.get_registered("race").unwrap(), winners[0]);
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = ConfigCache::new();
        let clone = cache.clone();
        clone.register("shared", NgramConfig::DEFAULT).unwrap();
        assert!(cache.contains("shared"));
    }
}
