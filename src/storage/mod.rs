//! String-keyed storage adapters the cache persists into.
//!
//! Every adapter is bound to a key prefix. [`StorageAdapter::clear`] and
//! [`StorageAdapter::keys`] only ever see keys under that prefix, so several
//! caches (or unrelated data) can share one backend safely.
//!
//! Adapters never return errors. A failing backend (disk full, unwritable
//! directory, corrupted file) is logged and degrades to "nothing was stored",
//! which the cache above treats as a miss.

use std::path::Path;
use std::sync::Arc;

pub mod file;
pub mod memory;
pub mod session;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use session::SessionStorage;

/// Key written by [`probe`] to check that a backend accepts writes.
const PROBE_SUFFIX: &str = "__storage_probe__";

/// Which backend a cache should persist into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StorageKind {
    /// Durable storage that survives process restarts (a JSON file on disk).
    #[default]
    Persistent,
    /// Storage shared by every client in this process, gone when it exits.
    Session,
    /// Private, bounded in-memory map.
    Memory,
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKind::Persistent => write!(f, "persistent"),
            StorageKind::Session => write!(f, "session"),
            StorageKind::Memory => write!(f, "memory"),
        }
    }
}

/// Uniform capability set over the storage backends.
///
/// **IMPORTANT:** Implementations must not panic or surface backend failures.
/// All methods use `&self`; backends rely on interior mutability.
pub trait StorageAdapter: Send + Sync {
    /// Read the raw string stored at `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` at `key`. Returns `false` when the backend refused the
    /// write; the failure has already been logged.
    fn set_item(&self, key: &str, value: &str) -> bool;

    /// Remove `key` if present.
    fn remove_item(&self, key: &str);

    /// Remove every key under this adapter's prefix.
    fn clear(&self);

    /// List every key under this adapter's prefix.
    fn keys(&self) -> Vec<String>;

    /// Which kind of backend this is.
    fn kind(&self) -> StorageKind;
}

/// Check that a backend accepts a throwaway write, reads it back and removes it.
pub fn probe(storage: &dyn StorageAdapter, prefix: &str) -> bool {
    let key = format!("{}{}", prefix, PROBE_SUFFIX);
    if !storage.set_item(&key, "1") {
        return false;
    }
    let readable = storage.get_item(&key).as_deref() == Some("1");
    storage.remove_item(&key);
    readable
}

/// Open the requested backend, falling back to [`MemoryStorage`] when it is
/// unavailable or fails the write probe.
///
/// # Arguments
/// - `kind`: requested backend
/// - `prefix`: key prefix the adapter is scoped to
/// - `path`: file used by [`StorageKind::Persistent`]
/// - `max_memory_entries`: bound for the in-memory adapter (and fallback)
pub fn open_storage(
    kind: StorageKind,
    prefix: &str,
    path: &Path,
    max_memory_entries: usize,
) -> Arc<dyn StorageAdapter> {
    let candidate: Option<Arc<dyn StorageAdapter>> = match kind {
        StorageKind::Persistent => match FileStorage::open(path, prefix) {
            Ok(storage) => Some(Arc::new(storage)),
            Err(e) => {
                warn!("Persistent storage at {} unavailable: {}", path.display(), e);
                None
            }
        },
        StorageKind::Session => Some(Arc::new(SessionStorage::new(prefix))),
        StorageKind::Memory => None,
    };

    if let Some(storage) = candidate {
        if probe(storage.as_ref(), prefix) {
            debug!("✓ Using {} storage for prefix {}", kind, prefix);
            return storage;
        }
        warn!(
            "⚠ {} storage failed write probe, falling back to memory",
            kind
        );
    }

    Arc::new(MemoryStorage::new(prefix, max_memory_entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_leaves_no_trace() {
        let storage = MemoryStorage::new("probe:", 10);
        assert!(probe(&storage, "probe:"));
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn test_open_memory_storage() {
        let storage = open_storage(StorageKind::Memory, "t:", Path::new("unused"), 10);
        assert_eq!(storage.kind(), StorageKind::Memory);
    }

    #[test]
    fn test_open_session_storage() {
        let storage = open_storage(StorageKind::Session, "open-session:", Path::new("unused"), 10);
        assert_eq!(storage.kind(), StorageKind::Session);
    }

    #[test]
    fn test_open_persistent_storage() {
        let dir = tempfile::tempdir().expect("Failed to create tempdir");
        let path = dir.path().join("cache.json");
        let storage = open_storage(StorageKind::Persistent, "t:", &path, 10);
        assert_eq!(storage.kind(), StorageKind::Persistent);
    }

    #[test]
    fn test_unwritable_persistent_storage_falls_back_to_memory() {
        let dir = tempfile::tempdir().expect("Failed to create tempdir");
        // A regular file where a directory is expected makes the store unopenable.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").expect("Failed to write blocker");
        let path = blocker.join("nested").join("cache.json");

        let storage = open_storage(StorageKind::Persistent, "t:", &path, 10);
        assert_eq!(storage.kind(), StorageKind::Memory);
        assert!(storage.set_item("t:key", "value"));
        assert_eq!(storage.get_item("t:key").as_deref(), Some("value"));
    }

    #[test]
    fn test_storage_kind_display() {
        assert_eq!(StorageKind::Persistent.to_string(), "persistent");
        assert_eq!(StorageKind::Session.to_string(), "session");
        assert_eq!(StorageKind::Memory.to_string(), "memory");
        assert_eq!(StorageKind::default(), StorageKind::Persistent);
    }
}
