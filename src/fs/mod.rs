//! Filesystem Backend Module
//!
//! Persists each chunk as a file under a sharded directory tree.
//!
//! ## Responsibilities
//! - Map keys to paths through the sharded codec
//! - Atomic chunk writes (temp file + rename)
//! - Recursive directory walks for range reads
//! - Merge the write-through cache with the on-disk view, one entry per key
//!
//! ## Layout
//! ```text
//! {base_dir}/
//!   ├── ab/                       shard: first two chars of segment 0
//!   │   └── cdef/                 rest of segment 0
//!   │       ├── snapshot/
//!   │       │   ├── 3f2a...       one file per chunk
//!   │       │   └── .tmpXyZ12     in-flight write, ignored by walks
//!   │       └── incremental/
//!   └── ...
//! ```
//!
//! A key can't be both stored and a strict prefix of another stored key:
//! one would need a file and the other a directory at the same path. Such a
//! save fails with an I/O error.
//!
//! Each escaped path component must fit in 255 bytes. Escaping can triple a
//! segment's length, so some keys are rejected here that other backends
//! accept.

mod backend;
mod cache;

pub use backend::FsStorageAdapter;
pub use cache::ChunkCache;
