//! Cache storage in a local directory.
//!
//! Each entry is one file named after its key. Atomicity comes from the
//! filesystem rather than from a lock, so several processes may share the
//! directory:
//!
//! - inserts write a hidden scratch file and hard-link it to the key, which
//!   fails instead of replacing an existing entry
//! - takes rename the entry to a private scratch name first; only one
//!   renamer can succeed, and the winner then reads and deletes its copy
//!
//! Hidden files (leading dot) are scratch files and never count as entries.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{CacheEntry, CacheKey, CacheStore, Insert};
use crate::error::{PdfSpliceError, Result};

/// Cache entries stored as files under one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|err| PdfSpliceError::cache_storage(root.display().to_string(), err))?;

        Ok(Self { root })
    }

    /// Directory holding the entries.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn scratch_path(&self, key: &CacheKey, purpose: &str) -> PathBuf {
        self.root
            .join(format!(".{key}.{}.{purpose}", Uuid::new_v4().simple()))
    }

    /// Entry files, skipping scratch files and anything that is not a file.
    fn entries(&self) -> Result<Vec<(CacheKey, fs::Metadata)>> {
        let storage_err = |err| PdfSpliceError::cache_storage(self.root.display().to_string(), err);

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.root).map_err(storage_err)? {
            let dir_entry = dir_entry.map_err(storage_err)?;
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            // Entries may vanish between listing and stat.
            let metadata = match dir_entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(storage_err(err)),
            };
            if metadata.is_file() {
                entries.push((CacheKey::from(name), metadata));
            }
        }

        Ok(entries)
    }
}

fn modified_at(metadata: &fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

impl CacheStore for DirectoryStore {
    fn insert_new(&self, key: &CacheKey, entry: CacheEntry) -> Result<Insert> {
        let storage_err = |err| PdfSpliceError::cache_storage(key.as_str(), err);

        let scratch = self.scratch_path(key, "new");
        fs::write(&scratch, &entry.bytes).map_err(storage_err)?;

        let linked = fs::hard_link(&scratch, self.entry_path(key));
        let _ = fs::remove_file(&scratch);

        match linked {
            Ok(()) => Ok(Insert::Stored),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(Insert::Occupied(entry)),
            Err(err) => Err(storage_err(err)),
        }
    }

    fn take(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let storage_err = |err| PdfSpliceError::cache_storage(key.as_str(), err);

        let claimed = self.scratch_path(key, "take");
        match fs::rename(self.entry_path(key), &claimed) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(storage_err(err)),
        }

        let created_at = fs::metadata(&claimed)
            .map(|metadata| modified_at(&metadata))
            .map_err(storage_err)?;
        let bytes = fs::read(&claimed);
        let _ = fs::remove_file(&claimed);

        Ok(Some(CacheEntry {
            bytes: bytes.map_err(storage_err)?,
            created_at,
        }))
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(PdfSpliceError::cache_storage(key.as_str(), err)),
        }
    }

    fn created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<CacheKey>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|(_, metadata)| modified_at(metadata) < cutoff)
            .map(|(key, _)| key)
            .collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for (key, _) in self.entries()? {
            if self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
