//! Durable storage adapter backed by a JSON file.
//!
//! The file is the only source of truth. Every operation re-reads it, and a
//! mutation rewrites it through a uniquely named temporary file that is
//! renamed over the target. Only the touched key (or this adapter's prefix on
//! `clear`) changes, so handles sharing one file never drop each other's keys.

use super::{StorageAdapter, StorageKind};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

type Entries = BTreeMap<String, String>;

/// File-backed storage that survives process restarts.
pub struct FileStorage {
    path: PathBuf,
    prefix: String,
    // Serializes read-modify-write cycles from this handle.
    guard: Mutex<()>,
}

impl FileStorage {
    /// Open (or create) the store at `path`.
    ///
    /// A missing file starts empty. A corrupted file is logged and replaced by
    /// an empty store on the next write.
    ///
    /// # Errors
    /// Returns `Err` when the parent directory cannot be created or the file
    /// exists but cannot be read.
    pub fn open(path: &Path, prefix: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let storage = FileStorage {
            path: path.to_path_buf(),
            prefix: prefix.to_string(),
            guard: Mutex::new(()),
        };
        storage.load()?;
        Ok(storage)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn load(&self) -> io::Result<Entries> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(
                    "⚠ Discarding corrupted storage file {}: {}",
                    self.path.display(),
                    e
                );
                Entries::new()
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e),
        }
    }

    fn load_or_log(&self) -> Option<Entries> {
        match self.load() {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("⚠ Storage read from {} failed: {}", self.path.display(), e);
                None
            }
        }
    }

    fn persist(&self, entries: &Entries) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let raw = serde_json::to_vec(entries)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&raw)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Apply one mutation to the current on-disk contents and write them back.
    ///
    /// `apply` returns whether anything changed; unchanged files are not
    /// rewritten.
    fn update<F: FnOnce(&mut Entries) -> bool>(&self, apply: F) -> bool {
        let _guard = self.lock();
        let mut entries = match self.load_or_log() {
            Some(entries) => entries,
            None => return false,
        };
        if !apply(&mut entries) {
            return true;
        }

        match self.persist(&entries) {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠ Storage write to {} failed: {}", self.path.display(), e);
                false
            }
        }
    }
}

impl StorageAdapter for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let _guard = self.lock();
        self.load_or_log()?.remove(key)
    }

    fn set_item(&self, key: &str, value: &str) -> bool {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove_item(&self, key: &str) {
        self.update(|entries| entries.remove(key).is_some());
    }

    fn clear(&self) {
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|key, _| !key.starts_with(&self.prefix));
            entries.len() != before
        });
    }

    fn keys(&self) -> Vec<String> {
        let _guard = self.lock();
        self.load_or_log()
            .unwrap_or_default()
            .into_keys()
            .filter(|key| key.starts_with(&self.prefix))
            .collect()
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Persistent
    }
}
