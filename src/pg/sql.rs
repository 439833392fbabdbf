//! SQL text for one chunk table
//!
//! The table name is spliced into statement text (identifiers can't be bound
//! as parameters), so it must pass [`validate_table_name`] first.
//!
//! [`validate_table_name`]: crate::config::validate_table_name

use crate::codec::SEPARATOR;

/// Serializes concurrent bootstraps of the same table across processes.
/// Released automatically when the bootstrap transaction ends.
pub(crate) const SCHEMA_LOCK: &str = "SELECT pg_advisory_xact_lock(hashtext('chunkstore:' || $1))";

/// Prepared statement text for one table
#[derive(Debug, Clone)]
pub(crate) struct Statements {
    pub select: String,
    pub upsert: String,
    pub delete: String,
    pub select_range: String,
    pub delete_range: String,
    pub select_all: String,
    pub delete_all: String,
    pub create_table: String,
    pub create_index: String,
}

impl Statements {
    pub fn new(table: &str) -> Self {
        // `$1` = encoded prefix, `$2` = LIKE pattern from `like_prefix_pattern`
        let in_range = "key_path = $1 OR key_path LIKE $2 ESCAPE '\\'";

        Self {
            select: format!("SELECT data FROM {table} WHERE key_path = $1"),
            upsert: format!(
                "INSERT INTO {table} (key_path, data) VALUES ($1, $2) \
                 ON CONFLICT (key_path) \
                 DO UPDATE SET data = EXCLUDED.data, updated_at = now()"
            ),
            delete: format!("DELETE FROM {table} WHERE key_path = $1"),
            select_range: format!(
                "SELECT key_path, data FROM {table} WHERE {in_range} ORDER BY key_path"
            ),
            delete_range: format!("DELETE FROM {table} WHERE {in_range}"),
            select_all: format!("SELECT key_path, data FROM {table} ORDER BY key_path"),
            delete_all: format!("DELETE FROM {table}"),
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 key_path TEXT PRIMARY KEY, \
                 data BYTEA NOT NULL, \
                 updated_at TIMESTAMPTZ NOT NULL DEFAULT now())"
            ),
            create_index: format!(
                "CREATE INDEX IF NOT EXISTS {table}_key_path_like_idx \
                 ON {table} (key_path text_pattern_ops)"
            ),
        }
    }
}

/// LIKE pattern matching every key strictly below `encoded_prefix`.
///
/// Percent-encoded keys are full of `%`, and `_` is left bare by the codec,
/// so both are escaped along with the escape character itself.
pub(crate) fn like_prefix_pattern(encoded_prefix: &str) -> String {
    let mut pattern = String::with_capacity(encoded_prefix.len() + 8);
    for c in encoded_prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push(SEPARATOR);
    pattern.push('%');
    pattern
}
