//! Bounded in-memory storage adapter.
//!
//! Uses DashMap for concurrent access. Each write is stamped with a
//! monotonically increasing sequence number; once the entry count exceeds the
//! bound, the entries with the lowest sequence numbers are evicted first.

use super::{StorageAdapter, StorageKind};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default bound on the number of stored entries.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

#[derive(Clone)]
struct Slot {
    seq: u64,
    value: String,
}

/// Thread-safe in-memory storage with oldest-first eviction.
///
/// Clones share the same underlying map.
///
/// # Example
///
/// ```
/// use content_kit::storage::{MemoryStorage, StorageAdapter};
///
/// let storage = MemoryStorage::new("app:", 2);
/// storage.set_item("app:a", "1");
/// storage.set_item("app:b", "2");
/// storage.set_item("app:c", "3");
///
/// assert_eq!(storage.get_item("app:a"), None);
/// assert_eq!(storage.len(), 2);
/// ```
#[derive(Clone)]
pub struct MemoryStorage {
    prefix: String,
    max_entries: usize,
    store: Arc<DashMap<String, Slot>>,
    next_seq: Arc<AtomicU64>,
}

impl MemoryStorage {
    /// Create an empty store scoped to `prefix` holding at most `max_entries`.
    ///
    /// A bound of zero is treated as one.
    pub fn new(prefix: &str, max_entries: usize) -> Self {
        MemoryStorage {
            prefix: prefix.to_string(),
            max_entries: max_entries.max(1),
            store: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current number of entries (all prefixes).
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn evict_overflow(&self) {
        while self.store.len() > self.max_entries {
            let oldest = self
                .store
                .iter()
                .min_by_key(|entry| entry.value().seq)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    self.store.remove(&key);
                    debug!("✓ Memory EVICT {}", key);
                }
                None => break,
            }
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("", DEFAULT_MAX_ENTRIES)
    }
}

impl StorageAdapter for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.store.get(key).map(|slot| slot.value.clone())
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.store.insert(
            key.to_string(),
            Slot {
                seq,
                value: value.to_string(),
            },
        );
        self.evict_overflow();
        true
    }

    fn remove_item(&self, key: &str) {
        self.store.remove(key);
    }

    fn clear(&self) {
        self.store.retain(|key, _| !key.starts_with(&self.prefix));
    }

    fn keys(&self) -> Vec<String> {
        self.store
            .iter()
            .filter(|entry| entry.key().starts_with(&self.prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_set_get_remove() {
        let storage = MemoryStorage::new("p:", 10);

        assert!(storage.set_item("p:key", "value"));
        assert_eq!(storage.get_item("p:key").as_deref(), Some("value"));

        storage.remove_item("p:key");
        assert_eq!(storage.get_item("p:key"), None);
    }

    #[test]
    fn test_memory_overwrite() {
        let storage = MemoryStorage::new("p:", 10);
        storage.set_item("p:key", "one");
        storage.set_item("p:key", "two");

        assert_eq!(storage.get_item("p:key").as_deref(), Some("two"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_memory_evicts_oldest_first() {
        let storage = MemoryStorage::new("p:", 3);
        for i in 0..5 {
            storage.set_item(&format!("p:{}", i), "v");
        }

        assert_eq!(storage.len(), 3);
        assert_eq!(storage.get_item("p:0"), None);
        assert_eq!(storage.get_item("p:1"), None);
        assert!(storage.get_item("p:2").is_some());
        assert!(storage.get_item("p:4").is_some());
    }

    #[test]
    fn test_memory_rewrite_refreshes_age() {
        let storage = MemoryStorage::new("p:", 2);
        storage.set_item("p:a", "1");
        storage.set_item("p:b", "2");
        storage.set_item("p:a", "1b");
        storage.set_item("p:c", "3");

        assert_eq!(storage.get_item("p:b"), None);
        assert_eq!(storage.get_item("p:a").as_deref(), Some("1b"));
    }

    #[test]
    fn test_memory_clear_is_prefix_scoped() {
        let storage = MemoryStorage::new("mine:", 10);
        storage.set_item("mine:a", "1");
        storage.set_item("mine:b", "2");
        storage.set_item("other:c", "3");

        storage.clear();

        assert!(storage.keys().is_empty());
        assert_eq!(storage.get_item("other:c").as_deref(), Some("3"));
    }

    #[test]
    fn test_memory_keys_are_prefix_scoped() {
        let storage = MemoryStorage::new("mine:", 10);
        storage.set_item("mine:a", "1");
        storage.set_item("other:b", "2");

        assert_eq!(storage.keys(), vec!["mine:a".to_string()]);
    }

    #[test]
    fn test_memory_clone_shares_store() {
        let storage = MemoryStorage::new("p:", 10);
        let clone = storage.clone();
        storage.set_item("p:key", "value");

        assert_eq!(clone.get_item("p:key").as_deref(), Some("value"));
    }
}
