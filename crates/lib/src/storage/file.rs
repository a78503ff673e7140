//! File-backed key-value store: one JSON object of string values.
//!
//! Writers serialize on a sibling `.lock` file and never wait for it: if another process holds
//! the lock the write fails with [`StorageError::Locked`]. The new contents go to a temp file that
//! is renamed over the old one, so readers need no lock and a crash never leaves a torn file.

use super::{KeyValueStore, StorageError};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

type Entries = BTreeMap<String, String>;

/// Key-value store persisted to a JSON file (e.g. ~/.zameen/chat_storage.json).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `path`. The file and its parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        sibling(&self.path, "lock")
    }

    fn read_entries(&self) -> Result<Entries, StorageError> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        if s.trim().is_empty() {
            return Ok(Entries::new());
        }
        Ok(serde_json::from_str(&s)?)
    }

    fn update(&self, apply: impl FnOnce(&mut Entries)) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.lock_path())?;
        if let Err(e) = FileExt::try_lock_exclusive(&lock) {
            return Err(if e.kind() == fs2::lock_contended_error().kind() {
                StorageError::Locked(self.path.clone())
            } else {
                e.into()
            });
        }
        let result = self.rewrite(apply);
        let _ = FileExt::unlock(&lock);
        result
    }

    fn rewrite(&self, apply: impl FnOnce(&mut Entries)) -> Result<(), StorageError> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(StorageError::Json(e)) => {
                log::warn!(
                    "storage file {} is malformed, starting over: {}",
                    self.path.display(),
                    e
                );
                Entries::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut entries);
        let json = serde_json::to_string_pretty(&entries)?;

        let tmp_path = sibling(&self.path, "tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(json.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// `chat_storage.json` -> `chat_storage.json.<suffix>`, in the same directory.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}
