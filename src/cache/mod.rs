//! Short-lived upload cache.
//!
//! The analyze/split workflow uploads a document once, answers with its page
//! count and a key, and later extracts pages from the cached bytes. The
//! cache guarantees:
//!
//! - `put` never overwrites an existing entry and hands out a fresh key per call
//! - `get_and_remove` is single use: of any number of concurrent callers
//!   presenting the same key, exactly one receives the bytes
//! - `delete` is idempotent
//!
//! Storage is pluggable through [`CacheStore`]; [`MemoryStore`] and
//! [`DirectoryStore`] ship with the crate. Age based eviction is offered as
//! a helper ([`DocumentCache::evict_older_than`]); when to run it is the
//! caller's policy.
//!
//! # Examples
//!
//! ```
//! use pdfsplice::cache::DocumentCache;
//!
//! # fn example() -> pdfsplice::Result<()> {
//! let cache = DocumentCache::in_memory();
//! let key = cache.put(b"%PDF-1.7 ...".to_vec())?;
//!
//! let bytes = cache.get_and_remove(key.as_str())?;
//! assert!(cache.get_and_remove(key.as_str()).is_err());
//! # Ok(())
//! # }
//! ```

pub mod directory;
pub mod key;
pub mod memory;

pub use directory::DirectoryStore;
pub use key::CacheKey;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use crate::error::{PdfSpliceError, Result};

/// Attempts at drawing an unused key before giving up.
const MAX_KEY_ATTEMPTS: usize = 8;

/// Cached upload bytes and when they were stored.
#[derive(Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Document bytes.
    pub bytes: Vec<u8>,

    /// Time the entry was stored.
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("bytes", &self.bytes.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Outcome of [`CacheStore::insert_new`].
#[derive(Debug)]
pub enum Insert {
    /// The entry was stored under the key.
    Stored,
    /// The key was taken; the entry is handed back untouched.
    Occupied(CacheEntry),
}

/// Key-value storage behind a [`DocumentCache`].
///
/// Implementations must make every operation atomic per key.
pub trait CacheStore: Send + Sync {
    /// Store `entry` under `key` unless the key is already present.
    fn insert_new(&self, key: &CacheKey, entry: CacheEntry) -> Result<Insert>;

    /// Remove and return the entry under `key`.
    fn take(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Remove the entry under `key`, reporting whether one existed.
    fn remove(&self, key: &CacheKey) -> Result<bool>;

    /// Keys of entries stored before `cutoff`.
    fn created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<CacheKey>>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize>;

    /// Remove every entry, returning how many were removed.
    fn clear(&self) -> Result<usize>;
}

/// Single-use cache of uploaded documents.
pub struct DocumentCache {
    store: Box<dyn CacheStore>,
}

impl DocumentCache {
    /// Create a cache over the given store.
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Create a cache kept in process memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Store document bytes under a fresh key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn put(&self, bytes: Vec<u8>) -> Result<CacheKey> {
        self.insert(None, bytes)
    }

    /// Store document bytes under a fresh key that carries the upload name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn put_named(&self, name: &str, bytes: Vec<u8>) -> Result<CacheKey> {
        self.insert(Some(name), bytes)
    }

    fn insert(&self, name: Option<&str>, bytes: Vec<u8>) -> Result<CacheKey> {
        let mut entry = CacheEntry::new(bytes);

        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = CacheKey::generate(name);
            match self.store.insert_new(&key, entry)? {
                Insert::Stored => return Ok(key),
                Insert::Occupied(returned) => entry = returned,
            }
        }

        Err(PdfSpliceError::other(format!(
            "Could not allocate a unique cache key after {MAX_KEY_ATTEMPTS} attempts"
        )))
    }

    /// Fetch and delete the entry under `key` in one step.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::CacheKeyNotFound`] if the key is unknown,
    /// malformed, expired or already consumed.
    pub fn get_and_remove(&self, key: &str) -> Result<Vec<u8>> {
        let key = CacheKey::from(key);
        if !key.is_well_formed() {
            return Err(PdfSpliceError::key_not_found(key.as_str()));
        }

        self.store
            .take(&key)?
            .map(|entry| entry.bytes)
            .ok_or_else(|| PdfSpliceError::key_not_found(key.as_str()))
    }

    /// Remove the entry under `key` if present.
    ///
    /// Returns whether an entry was removed; an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let key = CacheKey::from(key);
        if !key.is_well_formed() {
            return Ok(false);
        }

        self.store.remove(&key)
    }

    /// Remove entries older than `max_age`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_age` is out of range or the store fails.
    pub fn evict_older_than(&self, max_age: Duration) -> Result<usize> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|err| PdfSpliceError::invalid_config(format!("Invalid cache TTL: {err}")))?;
        let cutoff = Utc::now() - max_age;

        let mut evicted = 0;
        for key in self.store.created_before(cutoff)? {
            if self.store.remove(&key)? {
                evicted += 1;
            }
        }

        Ok(evicted)
    }

    /// Number of cached entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn len(&self) -> Result<usize> {
        self.store.len()
    }

    /// Whether the cache holds no entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn clear(&self) -> Result<usize> {
        self.store.clear()
    }
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("entries", &self.store.len().ok())
            .finish()
    }
}
