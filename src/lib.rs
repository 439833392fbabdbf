//! # chunkstore
//!
//! A chunk store addressed by hierarchical keys, with:
//! - Point load / save / remove
//! - Prefix range load / remove with exact segment-boundary semantics
//! - A sharded filesystem backend with a write-through cache
//! - A PostgreSQL backend with atomic upserts and idempotent schema bootstrap
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Document sync engine (caller)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  StorageAdapter
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        ChunkStore                            │
//! │              (backend chosen when opened)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Filesystem  │          │  Postgres   │
//!   │ cache+files │          │ one table   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        ▼
//!   ShardedPathCodec           FlatCodec
//!   ab/cdef/x/y                abcdef/x/y
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use chunkstore::{FsStorageAdapter, StorageAdapter, StorageKey};
//!
//! # async fn demo() -> chunkstore::Result<()> {
//! let store = FsStorageAdapter::open_path("./chunkstore-data").await?;
//! let key = StorageKey::from(["doc1", "snapshot", "h1"]);
//! store.save(&key, Bytes::from_static(b"chunk")).await?;
//! let chunks = store.load_range(&StorageKey::from(["doc1"])).await?;
//! assert_eq!(chunks.len(), 1);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod key;

pub mod codec;
pub mod adapter;
pub mod fs;
pub mod pg;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use adapter::StorageAdapter;
pub use config::{FsConfig, PgConfig, StoreConfig};
pub use error::{ChunkStoreError, Result};
pub use fs::FsStorageAdapter;
pub use key::{Chunk, StorageKey};
pub use pg::PgStorageAdapter;
pub use store::ChunkStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of chunkstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
