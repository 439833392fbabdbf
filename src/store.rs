//! Backend selection
//!
//! The backend is picked once, when the store is opened; afterwards callers
//! only see [`StorageAdapter`].

use async_trait::async_trait;
use bytes::Bytes;

use crate::adapter::StorageAdapter;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::fs::FsStorageAdapter;
use crate::key::{Chunk, StorageKey};
use crate::pg::PgStorageAdapter;

/// A chunk store over one of the fixed backends
#[derive(Debug)]
pub enum ChunkStore {
    Filesystem(FsStorageAdapter),
    Postgres(PgStorageAdapter),
}

impl ChunkStore {
    /// Open the backend named by `config`
    pub async fn open(config: StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Filesystem(fs) => FsStorageAdapter::open(fs).await.map(Self::Filesystem),
            StoreConfig::Postgres(pg) => PgStorageAdapter::connect(pg).await.map(Self::Postgres),
        }
    }

    /// Open the backend described by the process environment
    pub async fn from_env() -> Result<Self> {
        Self::open(StoreConfig::from_env()?).await
    }

    /// Create backing schema objects; nothing to do for the filesystem
    pub async fn ensure_schema(&self) -> Result<()> {
        match self {
            Self::Filesystem(_) => Ok(()),
            Self::Postgres(pg) => pg.ensure_schema().await,
        }
    }

    /// Release pooled resources
    pub async fn close(&self) {
        if let Self::Postgres(pg) = self {
            pg.close().await;
        }
    }

    /// Short backend name for logs
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Filesystem(_) => "filesystem",
            Self::Postgres(_) => "postgres",
        }
    }

    fn adapter(&self) -> &dyn StorageAdapter {
        match self {
            Self::Filesystem(fs) => fs,
            Self::Postgres(pg) => pg,
        }
    }
}

#[async_trait]
impl StorageAdapter for ChunkStore {
    async fn load(&self, key: &StorageKey) -> Result<Option<Bytes>> {
        self.adapter().load(key).await
    }

    async fn save(&self, key: &StorageKey, data: Bytes) -> Result<()> {
        self.adapter().save(key, data).await
    }

    async fn remove(&self, key: &StorageKey) -> Result<()> {
        self.adapter().remove(key).await
    }

    async fn load_range(&self, prefix: &StorageKey) -> Result<Vec<Chunk>> {
        self.adapter().load_range(prefix).await
    }

    async fn remove_range(&self, prefix: &StorageKey) -> Result<()> {
        self.adapter().remove_range(prefix).await
    }
}
