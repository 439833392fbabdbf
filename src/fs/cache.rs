//! Chunk cache
//!
//! BTreeMap-based write-through cache with a parking_lot RwLock.
//!
//! Keys are kept ordered so every key under a prefix sits in one contiguous
//! run starting at the prefix itself; prefix lookups are a range scan, not a
//! full sweep.

use std::collections::BTreeMap;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::key::StorageKey;

/// In-memory mirror of recently written chunks
///
/// ## Concurrency:
/// - One RwLock around entries and the byte counter
/// - Many concurrent readers, one writer at a time
/// - Payloads are `Bytes`, so reads clone a refcount, not the data
pub struct ChunkCache {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<StorageKey, Bytes>,
    /// Sum of payload lengths
    size: usize,
}

impl ChunkCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Cached payload for exactly `key`
    pub fn get(&self, key: &StorageKey) -> Option<Bytes> {
        self.inner.read().entries.get(key).cloned()
    }

    pub fn contains(&self, key: &StorageKey) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    /// Insert or replace; returns the new total payload size
    pub fn insert(&self, key: StorageKey, data: Bytes) -> usize {
        let mut inner = self.inner.write();
        let added = data.len();
        if let Some(old) = inner.entries.insert(key, data) {
            inner.size -= old.len();
        }
        inner.size += added;
        inner.size
    }

    /// Evict exactly `key`
    pub fn remove(&self, key: &StorageKey) -> Option<Bytes> {
        let mut inner = self.inner.write();
        let removed = inner.entries.remove(key);
        if let Some(old) = &removed {
            inner.size -= old.len();
        }
        removed
    }

    /// Evict `key` only if it still maps to `data`.
    ///
    /// Used to roll back a write whose disk half failed without clobbering a
    /// newer value cached by a concurrent save.
    pub fn remove_if_unchanged(&self, key: &StorageKey, data: &Bytes) -> bool {
        let mut inner = self.inner.write();
        if inner.entries.get(key) != Some(data) {
            return false;
        }
        if let Some(old) = inner.entries.remove(key) {
            inner.size -= old.len();
        }
        true
    }

    /// Every cached key equal to or prefixed by `prefix`, in key order
    pub fn keys_with_prefix(&self, prefix: &StorageKey) -> Vec<StorageKey> {
        let inner = self.inner.read();
        inner
            .entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Evict every key equal to or prefixed by `prefix`; returns the count
    pub fn remove_prefix(&self, prefix: &StorageKey) -> usize {
        let mut inner = self.inner.write();
        let doomed: Vec<StorageKey> = inner
            .entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            if let Some(old) = inner.entries.remove(key) {
                inner.size -= old.len();
            }
        }
        doomed.len()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Total cached payload bytes
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.size = 0;
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChunkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ChunkCache")
            .field("entries", &inner.entries.len())
            .field("size", &inner.size)
            .finish()
    }
}
