//! Key Codec Module
//!
//! Lossless mappings between a [`StorageKey`] and a backend's native address.
//!
//! ## Responsibilities
//! - Escape every segment independently so separator-like characters inside
//!   a segment can never be read as a boundary
//! - Keep the encoding of a prefix a boundary-aligned prefix of the full
//!   encoding, so prefix queries on the encoded form match only true
//!   hierarchical prefixes
//! - Reject on decode anything the encoder could not have produced
//!
//! ## Encodings
//! ```text
//! key ["doc 1", "a/b"]
//!   flat     →  "doc%201/a%2Fb"                 (relational key_path column)
//!   sharded  →  "do" / "c%201" / "a%2Fb"         (filesystem, relative path)
//! ```

mod flat;
mod sharded;

pub use flat::{FlatCodec, SEPARATOR};
pub use sharded::{ShardedPathCodec, MAX_COMPONENT_BYTES};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet};

use crate::error::{ChunkStoreError, Result};
use crate::key::StorageKey;

/// Bidirectional key encoding for one backend
///
/// `decode(&encode(k)) == k` for every non-empty key.
pub trait KeyCodec {
    /// Borrowed form accepted by `decode` (`str`, `Path`)
    type Encoded: ?Sized + ToOwned;

    fn encode(&self, key: &StorageKey) -> <Self::Encoded as ToOwned>::Owned;

    fn decode(&self, encoded: &Self::Encoded) -> Result<StorageKey>;
}

/// Percent-encode one segment with the given escape set
pub(crate) fn escape_segment(segment: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(segment, set).to_string()
}

/// Decode one segment, accepting only the canonical form the encoder emits
pub(crate) fn unescape_segment(encoded: &str, set: &'static AsciiSet) -> Result<String> {
    let decoded = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|e| {
            ChunkStoreError::Encoding(format!("segment {:?} is not UTF-8: {}", encoded, e))
        })?
        .into_owned();

    // Catches malformed escapes, lowercase hex and needlessly escaped bytes,
    // any of which would let two stored forms alias one key.
    if escape_segment(&decoded, set) != encoded {
        return Err(ChunkStoreError::Encoding(format!(
            "segment {:?} is not in canonical encoded form",
            encoded
        )));
    }

    Ok(decoded)
}
