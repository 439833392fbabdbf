//! Relational Backend Module
//!
//! Persists each chunk as a row in one PostgreSQL table.
//!
//! ## Table
//! ```text
//! ┌──────────────────────┬─────────┬──────────────────────────┐
//! │ key_path TEXT (PK)   │ data    │ updated_at TIMESTAMPTZ   │
//! ├──────────────────────┼─────────┼──────────────────────────┤
//! │ doc1/snapshot/h1     │ BYTEA   │ now() on insert/update   │
//! └──────────────────────┴─────────┴──────────────────────────┘
//! index: (key_path text_pattern_ops) for prefix LIKE
//! ```
//!
//! ## Range predicate
//! `key_path = prefix OR key_path LIKE escaped(prefix) || '/%'`. The equality
//! arm covers a prefix that is itself a stored key; the `/` keeps `ab/c`
//! from matching `ab/cde`.

mod backend;
mod sql;

pub use backend::PgStorageAdapter;
