//! Storage Adapter Interface
//!
//! The contract the document-sync layer depends on. Both backends implement
//! it; callers never see which substrate serves them.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::key::{Chunk, StorageKey};

/// Chunk persistence keyed by hierarchical [`StorageKey`]s.
///
/// All implementations must satisfy these invariants:
/// - At most one live value per exact key; the last completed `save` wins.
/// - Absence is a value, not an error: `load` returns `Ok(None)`, range reads
///   return an empty `Vec`, removals of absent keys succeed.
/// - Range operations match segment-wise: `["ab"]` never covers `["abc"]`.
/// - No cross-key transactions. A `remove_range` racing a `save` inside the
///   range has no defined winner.
/// - Storage medium failures propagate; nothing is retried internally.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Read the payload stored under exactly `key`.
    async fn load(&self, key: &StorageKey) -> Result<Option<Bytes>>;

    /// Create or overwrite the payload under `key`.
    async fn save(&self, key: &StorageKey, data: Bytes) -> Result<()>;

    /// Delete the entry under exactly `key`. Succeeds if it was already absent.
    async fn remove(&self, key: &StorageKey) -> Result<()>;

    /// Every entry whose key equals or is prefixed by `prefix`, unordered and
    /// deduplicated by key. The empty prefix covers the whole store.
    async fn load_range(&self, prefix: &StorageKey) -> Result<Vec<Chunk>>;

    /// Delete every entry whose key equals or is prefixed by `prefix`.
    async fn remove_range(&self, prefix: &StorageKey) -> Result<()>;
}
