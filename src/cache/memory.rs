//! In-process cache storage.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::{CacheEntry, CacheKey, CacheStore, Insert};
use crate::error::Result;

/// Cache entries held in a mutex-guarded map.
///
/// Every operation takes the lock once, so insert-if-absent and
/// take-and-remove are atomic with respect to each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn insert_new(&self, key: &CacheKey, entry: CacheEntry) -> Result<Insert> {
        match self.entries.lock().entry(key.clone()) {
            Entry::Occupied(_) => Ok(Insert::Occupied(entry)),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(Insert::Stored)
            }
        }
    }

    fn take(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.lock().remove(key))
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    fn created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<CacheKey>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.created_at < cutoff)
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.lock().len())
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
