//! Storage keys and chunks
//!
//! A [`StorageKey`] is an ordered sequence of opaque string segments, e.g.
//! `[document_id, chunk_type, chunk_id]`. Point operations compare keys by
//! exact segment-wise equality; range operations by segment-wise prefix.
//!
//! ```text
//! prefix ["doc1"]        matches ["doc1"], ["doc1","a"], ["doc1","a","x"]
//! prefix ["ab"]          does NOT match ["abc"] or ["a","bc"]
//! ```

use std::fmt;

use bytes::Bytes;

use crate::error::{ChunkStoreError, Result};

/// Hierarchical key addressing one chunk
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StorageKey(Vec<String>);

impl StorageKey {
    /// Create a key from its segments
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// The empty key; only meaningful as a range prefix (whole store)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Segments in order
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segment-wise prefix match. Every key starts with itself and with the
    /// empty key.
    pub fn starts_with(&self, prefix: &StorageKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Return a new key with `segment` appended
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Reject the empty key for point operations
    pub(crate) fn ensure_point(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(ChunkStoreError::InvalidKey(
                "point operations need at least one segment".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_segments(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for StorageKey {
    /// Segments joined with `/`; for logs only, not an encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<Vec<String>> for StorageKey {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<Vec<&str>> for StorageKey {
    fn from(segments: Vec<&str>) -> Self {
        segments.into_iter().collect()
    }
}

impl From<&[&str]> for StorageKey {
    fn from(segments: &[&str]) -> Self {
        segments.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for StorageKey {
    fn from(segments: [&str; N]) -> Self {
        segments.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for StorageKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A stored entry returned by range reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub key: StorageKey,
    pub data: Bytes,
}

impl Chunk {
    pub fn new(key: StorageKey, data: impl Into<Bytes>) -> Self {
        Self {
            key,
            data: data.into(),
        }
    }
}
