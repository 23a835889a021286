//! Process-scoped storage adapter.
//!
//! All `SessionStorage` handles in a process read and write the same map,
//! which lives until the process exits. This is the session tier: shared
//! across clients, never persisted.

use super::{StorageAdapter, StorageKind};
use dashmap::DashMap;
use std::sync::OnceLock;

fn session_store() -> &'static DashMap<String, String> {
    static STORE: OnceLock<DashMap<String, String>> = OnceLock::new();
    STORE.get_or_init(DashMap::new)
}

/// Handle onto the process-wide session map, scoped to a key prefix.
#[derive(Clone, Debug)]
pub struct SessionStorage {
    prefix: String,
}

impl SessionStorage {
    pub fn new(prefix: &str) -> Self {
        SessionStorage {
            prefix: prefix.to_string(),
        }
    }
}

impl StorageAdapter for SessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        session_store().get(key).map(|value| value.clone())
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        session_store().insert(key.to_string(), value.to_string());
        true
    }

    fn remove_item(&self, key: &str) {
        session_store().remove(key);
    }

    fn clear(&self) {
        session_store().retain(|key, _| !key.starts_with(&self.prefix));
    }

    fn keys(&self) -> Vec<String> {
        session_store()
            .iter()
            .filter(|entry| entry.key().starts_with(&self.prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Session
    }
}
