//! Filesystem backend
//!
//! One file per chunk under a sharded directory tree, fronted by a
//! write-through [`ChunkCache`].

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};
use walkdir::{DirEntry, WalkDir};

use crate::adapter::StorageAdapter;
use crate::codec::{KeyCodec, ShardedPathCodec, MAX_COMPONENT_BYTES};
use crate::config::FsConfig;
use crate::error::{ChunkStoreError, Result};
use crate::key::{Chunk, StorageKey};

use super::ChunkCache;

/// Max chunk files read at once while resolving a range
const RANGE_LOAD_CONCURRENCY: usize = 64;

/// Lock stripes serializing writers of the same key
const KEY_LOCK_STRIPES: usize = 64;

/// Chunk store rooted at a base directory
///
/// ## Consistency:
/// - `save` updates the cache, then renames a fully written temp file into
///   place. Readers never see a partial file.
/// - `save` and `remove` hold the key's lock stripe across both the cache
///   step and the disk step, and `remove_range` holds every stripe. Writers
///   of one key are therefore ordered, and once they return the cache never
///   holds a value the disk lacks.
/// - Readers take no locks. A `load` racing a `save` may see the new value
///   in the cache before its file is renamed into place.
/// - The cache only ever holds values this process wrote. Disk reads do not
///   backfill it, so a slow read can never plant a value older than one a
///   concurrent `save` already cached.
/// - No cross-key transactions.
///
/// ## Memory:
/// Every payload saved stays cached until it is removed, so resident memory
/// grows with the total size of chunks written by this process
/// ([`ChunkCache::size`]). Nothing is evicted on pressure.
///
/// ## Key limits:
/// Each path component is at most [`MAX_COMPONENT_BYTES`] bytes after
/// escaping. `save` rejects longer keys with `InvalidKey`; reads and removes
/// treat them as absent, since nothing can be stored under them.
pub struct FsStorageAdapter {
    /// Root of the chunk tree
    base_dir: PathBuf,

    /// fsync temp files before renaming
    fsync: bool,

    codec: ShardedPathCodec,

    /// Recently written chunks, authoritative over disk within a scan
    cache: ChunkCache,

    locks: KeyLocks,
}

impl FsStorageAdapter {
    /// Open or create a store in `config.base_dir`
    pub async fn open(config: FsConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.base_dir).await?;

        tracing::info!(
            base_dir = %config.base_dir.display(),
            fsync = config.fsync,
            "Filesystem chunk store opened"
        );

        Ok(Self {
            base_dir: config.base_dir,
            fsync: config.fsync,
            codec: ShardedPathCodec,
            cache: ChunkCache::new(),
            locks: KeyLocks::new(KEY_LOCK_STRIPES),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified base directory
    pub async fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(FsConfig::builder().base_dir(path).build()).await
    }

    /// Get the base directory path
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of chunks currently cached
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// File path a key is stored at
    pub fn chunk_path(&self, key: &StorageKey) -> PathBuf {
        self.codec.path_under(&self.base_dir, key)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// On-disk path for `key`, or `None` if a component is too long to exist
    fn locate(&self, key: &StorageKey) -> Option<PathBuf> {
        self.codec.fits(key).then(|| self.chunk_path(key))
    }

    /// Delete everything below the base directory, keeping the directory
    async fn clear_base_dir(&self) -> Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if is_absent(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            remove_path(&entry.path()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for FsStorageAdapter {
    async fn load(&self, key: &StorageKey) -> Result<Option<Bytes>> {
        key.ensure_point()?;

        if let Some(data) = self.cache.get(key) {
            tracing::trace!(key = %key, "cache hit");
            return Ok(Some(data));
        }

        let Some(path) = self.locate(key) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => {
                // Only a prefix of stored keys, not a key itself
                if is_dir(&path).await {
                    Ok(None)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn save(&self, key: &StorageKey, data: Bytes) -> Result<()> {
        key.ensure_point()?;

        let Some(path) = self.locate(key) else {
            return Err(ChunkStoreError::InvalidKey(format!(
                "{} has a path component longer than {} bytes once escaped",
                key, MAX_COMPONENT_BYTES
            )));
        };

        let _guard = self.locks.lock(key).await;

        self.cache.insert(key.clone(), data.clone());

        let fsync = self.fsync;
        let payload = data.clone();
        let written = match tokio::task::spawn_blocking(move || {
            write_atomic(&path, &payload, fsync)
        })
        .await
        {
            Ok(result) => result.map_err(ChunkStoreError::from),
            Err(e) => Err(ChunkStoreError::from(e)),
        };

        if let Err(e) = written {
            // Disk still holds the previous value (or nothing); don't let the
            // cache claim otherwise.
            self.cache.remove_if_unchanged(key, &data);
            tracing::debug!(key = %key, error = %e, "chunk write failed");
            return Err(e);
        }

        tracing::debug!(key = %key, bytes = data.len(), "chunk saved");
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> Result<()> {
        key.ensure_point()?;

        let _guard = self.locks.lock(key).await;

        self.cache.remove(key);

        let Some(path) = self.locate(key) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if is_absent(&e) => {}
            Err(e) => {
                if !is_dir(&path).await {
                    return Err(e.into());
                }
            }
        }

        tracing::debug!(key = %key, "chunk removed");
        Ok(())
    }

    async fn load_range(&self, prefix: &StorageKey) -> Result<Vec<Chunk>> {
        let cached = self.cache.keys_with_prefix(prefix);

        let on_disk = match self.locate(prefix) {
            Some(root) => {
                let base = self.base_dir.clone();
                tokio::task::spawn_blocking(move || walk_keys(&base, &root)).await??
            }
            None => Vec::new(),
        };

        let cached_count = cached.len();
        let disk_count = on_disk.len();

        // One entry per exact key whichever side found it
        let keys: BTreeSet<StorageKey> = cached.into_iter().chain(on_disk).collect();

        // Cache-first resolution. A key removed between enumeration and load
        // resolves to None and is dropped.
        let chunks: Vec<Option<Chunk>> = stream::iter(keys)
            .map(|key| async move {
                let data = self.load(&key).await?;
                Ok::<_, ChunkStoreError>(data.map(|data| Chunk { key, data }))
            })
            .buffer_unordered(RANGE_LOAD_CONCURRENCY)
            .try_collect()
            .await?;

        let chunks: Vec<Chunk> = chunks.into_iter().flatten().collect();

        tracing::debug!(
            prefix = %prefix,
            cached = cached_count,
            on_disk = disk_count,
            returned = chunks.len(),
            "range loaded"
        );
        Ok(chunks)
    }

    async fn remove_range(&self, prefix: &StorageKey) -> Result<()> {
        // A save inside the range must not slip its cache entry in after the
        // eviction and its file in before the delete.
        let _guards = self.locks.lock_all().await;

        let evicted = self.cache.remove_prefix(prefix);

        if prefix.is_empty() {
            self.clear_base_dir().await?;
        } else if let Some(root) = self.locate(prefix) {
            remove_path(&root).await?;
        }

        tracing::debug!(prefix = %prefix, evicted, "range removed");
        Ok(())
    }
}

impl std::fmt::Debug for FsStorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsStorageAdapter")
            .field("base_dir", &self.base_dir)
            .field("fsync", &self.fsync)
            .field("cache", &self.cache)
            .finish()
    }
}

// =============================================================================
// Key Locks
// =============================================================================

/// Fixed set of async mutexes; a key always maps to the same stripe
struct KeyLocks {
    stripes: Vec<Mutex<()>>,
}

impl KeyLocks {
    fn new(count: usize) -> Self {
        Self {
            stripes: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    async fn lock(&self, key: &StorageKey) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.stripes.len() as u64) as usize;
        self.stripes[index].lock().await
    }

    /// Every stripe, taken in index order so point writers can't deadlock us
    async fn lock_all(&self) -> Vec<MutexGuard<'_, ()>> {
        let mut guards = Vec::with_capacity(self.stripes.len());
        for stripe in &self.stripes {
            guards.push(stripe.lock().await);
        }
        guards
    }
}

// =============================================================================
// Disk Helpers
// =============================================================================

/// Write `data` to a dot-prefixed temp file beside `path`, then rename it
/// over `path`.
fn write_atomic(path: &Path, data: &[u8], fsync: bool) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    if fsync {
        tmp.as_file().sync_all()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Every chunk key stored at or below `root`.
///
/// A missing `root` means zero matches. Dot-prefixed entries (in-flight
/// temp files) are skipped; any other undecodable path is an error.
fn walk_keys(base: &Path, root: &Path) -> Result<Vec<StorageKey>> {
    let codec = ShardedPathCodec;
    let mut keys = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => match e.io_error() {
                // Root missing, or a subtree removed mid-walk
                Some(io_err) if is_absent(io_err) => continue,
                _ => return Err(io::Error::from(e).into()),
            },
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(base).map_err(|_| {
            ChunkStoreError::Encoding(format!(
                "{} is outside {}",
                entry.path().display(),
                base.display()
            ))
        })?;
        keys.push(codec.decode(relative)?);
    }

    Ok(keys)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// Remove a file or a whole directory tree; absence is fine
async fn remove_path(path: &Path) -> Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if is_absent(&e) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match removed {
        Ok(()) => Ok(()),
        Err(e) if is_absent(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Errors that mean "nothing stored here"
fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::IsADirectory
    )
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}
