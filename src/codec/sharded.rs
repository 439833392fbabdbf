//! Sharded path codec
//!
//! Encodes a key as a relative filesystem path. The first segment is split
//! into a two-character shard directory and the rest of that segment, which
//! bounds the fan-out of the base directory.
//!
//! ```text
//! ["abcdef", "snapshot", "h1"]  →  ab/cdef/snapshot/h1
//! ["a", "x"]                    →  a/%/x          (empty tail marker)
//! ["", "x"]                     →  %/%/x          (empty segment marker)
//! ["../etc", "x"]               →  %2/E%2E%2Fetc/x
//! ```
//!
//! Only `A-Z a-z 0-9 - _` are left bare, so the encoder never emits `.`,
//! `..`, a dot-file name, or either path separator. A lone `%` is never a
//! valid escape and is reserved as the empty marker.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::error::{ChunkStoreError, Result};
use crate::key::StorageKey;

use super::{escape_segment, unescape_segment, KeyCodec};

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

/// Marker for an empty segment or an empty shard tail
const EMPTY: &str = "%";

/// Length of the shard directory name
const SHARD_LEN: usize = 2;

/// Longest file or directory name common filesystems accept (bytes)
pub const MAX_COMPONENT_BYTES: usize = 255;

/// `["abcdef", "x"]` ⇄ `ab/cdef/x`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardedPathCodec;

impl ShardedPathCodec {
    /// Path components for a key, shard directory first.
    /// The empty key has no components.
    pub fn components(&self, key: &StorageKey) -> Vec<String> {
        let Some((first, rest)) = key.segments().split_first() else {
            return Vec::new();
        };

        let head = encode_segment(first);
        let (shard, tail) = head.split_at(head.len().min(SHARD_LEN));

        let mut components = Vec::with_capacity(key.len() + 1);
        components.push(shard.to_string());
        components.push(if tail.is_empty() { EMPTY } else { tail }.to_string());
        components.extend(rest.iter().map(|segment| encode_segment(segment)));
        components
    }

    /// Whether every path component of `key` fits in one directory entry.
    ///
    /// Escaping can triple a segment's byte length, so a key the flat codec
    /// handles may still be unrepresentable on disk.
    pub fn fits(&self, key: &StorageKey) -> bool {
        self.components(key)
            .iter()
            .all(|component| component.len() <= MAX_COMPONENT_BYTES)
    }

    /// Absolute path of a key under `base`
    pub fn path_under(&self, base: &Path, key: &StorageKey) -> PathBuf {
        let mut path = base.to_path_buf();
        path.extend(self.components(key));
        path
    }
}

impl KeyCodec for ShardedPathCodec {
    type Encoded = Path;

    fn encode(&self, key: &StorageKey) -> PathBuf {
        self.components(key).into_iter().collect()
    }

    fn decode(&self, encoded: &Path) -> Result<StorageKey> {
        let mut parts = Vec::new();
        for component in encoded.components() {
            match component {
                Component::Normal(name) => match name.to_str() {
                    Some(name) => parts.push(name),
                    None => {
                        return Err(ChunkStoreError::Encoding(format!(
                            "non UTF-8 component in {}",
                            encoded.display()
                        )))
                    }
                },
                _ => {
                    return Err(ChunkStoreError::Encoding(format!(
                        "unexpected component in {}",
                        encoded.display()
                    )))
                }
            }
        }

        if parts.len() < 2 {
            return Err(ChunkStoreError::Encoding(format!(
                "{} is missing its shard directory",
                encoded.display()
            )));
        }

        let head = match parts[1] {
            EMPTY => parts[0].to_string(),
            tail => format!("{}{}", parts[0], tail),
        };

        let mut segments = Vec::with_capacity(parts.len() - 1);
        segments.push(decode_segment(&head)?);
        for part in &parts[2..] {
            segments.push(decode_segment(part)?);
        }
        let key = StorageKey::new(segments);

        // The shard split itself must be canonical too (e.g. reject `a/bc`
        // for a head that should have been `ab/c`).
        if self.components(&key) != parts {
            return Err(ChunkStoreError::Encoding(format!(
                "{} is not a canonical chunk path",
                encoded.display()
            )));
        }

        Ok(key)
    }
}

fn encode_segment(segment: &str) -> String {
    if segment.is_empty() {
        EMPTY.to_string()
    } else {
        escape_segment(segment, PATH_SEGMENT)
    }
}

fn decode_segment(encoded: &str) -> Result<String> {
    if encoded == EMPTY {
        Ok(String::new())
    } else {
        unescape_segment(encoded, PATH_SEGMENT)
    }
}
