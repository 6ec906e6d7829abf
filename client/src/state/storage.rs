//! Durable key-value storage for session entries.
//!
//! DESIGN
//! ======
//! Plays the role browser `localStorage` plays for a web client: string
//! values under string keys. Writes go through [`KeyValueStore::apply`] so a
//! multi-key change (token plus identity) lands all at once or not at all.
//! [`FileStorage`] keeps every key in one JSON object and replaces the file
//! with a temp-file rename.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Errors produced by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One mutation inside an atomic batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Set(&'static str, String),
    Remove(&'static str),
}

/// String key-value store with atomic batches.
pub trait KeyValueStore: Send + Sync {
    /// Read one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Apply every change, or none of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn apply(&self, changes: &[Change]) -> Result<(), StorageError>;
}

/// Decode a JSON value stored under `key`. Missing or unreadable entries yield `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key).ok().flatten()?;
    serde_json::from_str(&raw).ok()
}

/// Encode `value` as a JSON [`Change::Set`] for `key`.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn json_change<T: Serialize>(key: &'static str, value: &T) -> Result<Change, StorageError> {
    Ok(Change::Set(key, serde_json::to_string(value)?))
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw value, bypassing batches. Test and seeding helper.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn apply(&self, changes: &[Change]) -> Result<(), StorageError> {
        let mut entries = self.lock();
        apply_to_map(&mut entries, changes);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// Store backed by a single JSON object on disk.
///
/// A missing file reads as empty. An unparsable file is reported as
/// [`StorageError::Corrupt`] on read and overwritten by the next batch.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&self.path);
        let body = serde_json::to_vec_pretty(entries)?;
        {
            let mut file = open_private(&tmp)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn apply(&self, changes: &[Change]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut entries = match self.read_map() {
            Ok(entries) => entries,
            Err(StorageError::Corrupt(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "replacing corrupt storage file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply_to_map(&mut entries, changes);
        self.write_map(&entries)
    }
}

fn apply_to_map(entries: &mut BTreeMap<String, String>, changes: &[Change]) {
    for change in changes {
        match change {
            Change::Set(key, value) => {
                entries.insert((*key).to_owned(), value.clone());
            }
            Change::Remove(key) => {
                entries.remove(*key);
            }
        }
    }
}

/// Sibling temp name, unique per process and per write.
fn tmp_path(path: &Path) -> PathBuf {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(format!(".{}.{seq}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}
