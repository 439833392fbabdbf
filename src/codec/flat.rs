//! Flat codec
//!
//! Encodes a key as one text value: each segment percent-encoded, segments
//! joined with `/`. Used for the relational `key_path` column.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::error::Result;
use crate::key::StorageKey;

use super::{escape_segment, unescape_segment, KeyCodec};

/// Segment separator in the flat form
pub const SEPARATOR: char = '/';

/// Bytes left bare: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, the same unreserved set
/// as JavaScript's `encodeURIComponent`, so existing rows stay addressable.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `["a/b", "c"]` ⇄ `"a%2Fb/c"`
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatCodec;

impl KeyCodec for FlatCodec {
    type Encoded = str;

    fn encode(&self, key: &StorageKey) -> String {
        let parts: Vec<String> = key
            .segments()
            .iter()
            .map(|segment| escape_segment(segment, URI_COMPONENT))
            .collect();
        parts.join("/")
    }

    fn decode(&self, encoded: &str) -> Result<StorageKey> {
        encoded
            .split(SEPARATOR)
            .map(|part| unescape_segment(part, URI_COMPONENT))
            .collect::<Result<Vec<String>>>()
            .map(StorageKey::new)
    }
}
