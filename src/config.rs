//! Client and cache configuration.
//!
//! Both structs follow the builder style: start from `Default` (or
//! [`ClientConfig::new`]) and override with `with_*` methods.
//!
//! ```
//! use content_kit::config::{CacheConfig, ClientConfig};
//! use content_kit::storage::StorageKind;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("my-project", "https://cms.example.com/api")
//!     .with_locale("fr-FR")
//!     .with_cache(
//!         CacheConfig::default()
//!             .with_ttl(Duration::from_secs(600))
//!             .with_storage(StorageKind::Session),
//!     );
//! assert_eq!(config.cache.ttl, Duration::from_secs(600));
//! ```

use crate::storage::memory::DEFAULT_MAX_ENTRIES;
use crate::storage::StorageKind;
use std::path::PathBuf;
use std::time::Duration;

/// Default lifetime of cached query results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default lifetime of cached "not found" / empty results.
pub const DEFAULT_NULL_TTL: Duration = Duration::from_secs(30);

/// Default key namespace.
pub const DEFAULT_NAMESPACE: &str = "content-kit";

/// Locale a client starts with.
pub const DEFAULT_CLIENT_LOCALE: &str = "en-US";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cache behaviour.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    /// When `false` every query hits the network and nothing is stored.
    pub enabled: bool,

    /// Lifetime of cached results unless overridden per write.
    pub ttl: Duration,

    /// Lifetime of cached empty results (missing items, empty collections).
    ///
    /// Kept short so known-missing items are not refetched on every call but
    /// still show up soon after they are published.
    pub null_ttl: Duration,

    /// Requested storage backend. Falls back to memory when unavailable.
    pub storage: StorageKind,

    /// First segment of every cache key.
    pub namespace: String,

    /// Entry bound for in-memory storage.
    pub max_memory_entries: usize,

    /// File used by persistent storage. Defaults to the platform cache dir.
    pub storage_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl: DEFAULT_TTL,
            null_ttl: DEFAULT_NULL_TTL,
            storage: StorageKind::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_memory_entries: DEFAULT_MAX_ENTRIES,
            storage_path: None,
        }
    }
}

impl CacheConfig {
    /// A config with caching turned off.
    pub fn disabled() -> Self {
        CacheConfig {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_null_ttl(mut self, ttl: Duration) -> Self {
        self.null_ttl = ttl;
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_max_memory_entries(mut self, max: usize) -> Self {
        self.max_memory_entries = max;
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// File persistent storage will use.
    pub fn resolved_storage_path(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(DEFAULT_NAMESPACE)
                .join(format!("{}.json", self.namespace))
        })
    }
}

/// Everything needed to build a [`Client`](crate::client::Client).
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Project whose collections are queried.
    pub project_id: String,

    /// Base URL of the content API, e.g. `https://cms.example.com/api`.
    pub base_url: String,

    /// Initial locale.
    pub locale: String,

    /// Per-request timeout.
    pub timeout: Duration,

    pub cache: CacheConfig,
}

impl ClientConfig {
    pub fn new(project_id: &str, base_url: &str) -> Self {
        ClientConfig {
            project_id: project_id.to_string(),
            base_url: base_url.to_string(),
            locale: DEFAULT_CLIENT_LOCALE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache: CacheConfig::default(),
        }
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = locale.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
