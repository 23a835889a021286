//! TTL-aware cache over a [`StorageAdapter`].
//!
//! The cache is best-effort by contract: nothing in this module returns a
//! storage error. Absent, expired and corrupted entries all read as `None`
//! (expired and corrupted ones are deleted on the way), and failed writes are
//! logged and forgotten. Caching can never be the reason a query fails.

use crate::config::CacheConfig;
use crate::error::Result;
use crate::key::{CacheKeyBuilder, KeyComponents};
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::serialization::{deserialize_entry, serialize_entry, CacheEntry};
use crate::storage::{open_storage, MemoryStorage, StorageAdapter};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache of serialized query results.
///
/// # Example
///
/// ```
/// use content_kit::cache::Cache;
/// use content_kit::storage::MemoryStorage;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let storage = Arc::new(MemoryStorage::new("demo:", 100));
/// let cache = Cache::new(storage, "demo", Duration::from_secs(60));
///
/// cache.set("demo:greeting", &"hello", None);
/// assert_eq!(cache.get::<String>("demo:greeting").as_deref(), Some("hello"));
/// ```
pub struct Cache {
    storage: Arc<dyn StorageAdapter>,
    keys: CacheKeyBuilder,
    default_ttl: Duration,
    enabled: bool,
    metrics: Box<dyn CacheMetrics>,
}

impl Cache {
    /// Create an enabled cache writing into `storage` under `namespace`.
    pub fn new(storage: Arc<dyn StorageAdapter>, namespace: &str, default_ttl: Duration) -> Self {
        Cache {
            storage,
            keys: CacheKeyBuilder::new(namespace),
            default_ttl,
            enabled: true,
            metrics: Box::new(NoOpMetrics),
        }
    }

    /// Create a cache that never stores anything.
    ///
    /// It still owns an in-memory adapter so the rest of the client keeps a
    /// single code path.
    pub fn disabled(namespace: &str) -> Self {
        let prefix = format!("{}:", namespace);
        Cache {
            enabled: false,
            ..Self::new(
                Arc::new(MemoryStorage::new(&prefix, 1)),
                namespace,
                Duration::ZERO,
            )
        }
    }

    /// Build the cache described by `config`, opening (or falling back from)
    /// the configured storage backend.
    pub fn from_config(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled(&config.namespace);
        }

        let prefix = format!("{}:", config.namespace);
        let storage = open_storage(
            config.storage,
            &prefix,
            &config.resolved_storage_path(),
            config.max_memory_entries,
        );
        Self::new(storage, &config.namespace, config.ttl)
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn namespace(&self) -> &str {
        self.keys.namespace()
    }

    /// Key builder bound to this cache's namespace.
    pub fn key_builder(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    /// Storage adapter backing this cache (for advanced use).
    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// Derive the cache key for `components`.
    ///
    /// # Errors
    /// `Error::InvalidArgument` when a collection key lacks a slug or an
    /// asset key lacks an asset id.
    pub fn generate_key(&self, components: &KeyComponents) -> Result<String> {
        self.keys.build(components)
    }

    /// Read the value at `key`.
    ///
    /// Returns `None` when caching is disabled, the key is absent, the entry
    /// expired, or the entry cannot be decoded as `T`. Expired and
    /// undecodable entries are deleted.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let timer = Instant::now();
        let Some(raw) = self.storage.get_item(key) else {
            self.metrics.record_miss(key, timer.elapsed());
            return None;
        };

        let entry = match deserialize_entry::<T>(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠ Dropping corrupted cache entry {}: {}", key, e);
                self.metrics.record_error(key, &e.to_string());
                self.storage.remove_item(key);
                self.metrics.record_miss(key, timer.elapsed());
                return None;
            }
        };

        if entry.is_expired(self.default_ttl) {
            debug!("Cache entry {} expired", key);
            self.storage.remove_item(key);
            self.metrics.record_miss(key, timer.elapsed());
            return None;
        }

        self.metrics.record_hit(key, timer.elapsed());
        Some(entry.data)
    }

    /// Store `data` at `key` for `ttl` (or the default TTL).
    ///
    /// No-op when caching is disabled. Failures are logged, never returned.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        if !self.enabled {
            return;
        }

        let timer = Instant::now();
        let entry = CacheEntry::new(data, Some(ttl.unwrap_or(self.default_ttl)));
        let raw = match serialize_entry(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                self.metrics.record_error(key, &e.to_string());
                return;
            }
        };

        if self.storage.set_item(key, &raw) {
            self.metrics.record_set(key, timer.elapsed());
        } else {
            self.metrics.record_error(key, "storage rejected write");
        }
    }

    /// Remove one key.
    pub fn remove(&self, key: &str) {
        self.storage.remove_item(key);
        self.metrics.record_delete(key);
    }

    /// Remove every key under this cache's namespace. Unrelated keys in
    /// shared storage are left alone.
    pub fn clear(&self) {
        self.storage.clear();
        debug!("✓ Cleared cache namespace {}", self.namespace());
    }

    /// Remove every key for one project and locale.
    pub fn clear_locale_cache(&self, project_id: &str, locale: &str) {
        let prefix = self.keys.locale_prefix(project_id, locale);
        let removed = self.remove_prefix(&prefix);
        debug!("✓ Cleared {} entries for locale {}", removed, locale);
    }

    /// Remove every key starting with `prefix`. Returns how many were removed.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let doomed: Vec<String> = self
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    /// Every key under this cache's namespace.
    pub fn keys(&self) -> Vec<String> {
        let prefix = self.keys.namespace_prefix();
        self.storage
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&prefix))
            .collect()
    }

    /// Read every entry once so expired and corrupted ones get deleted.
    pub fn cleanup(&self) {
        let keys = self.keys();
        let before = keys.len();
        for key in keys {
            let _ = self.get::<serde_json::Value>(&key);
        }
        debug!(
            "✓ Cache cleanup: {} of {} entries remain",
            self.keys().len(),
            before
        );
    }
}
