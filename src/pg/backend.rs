//! PostgreSQL backend
//!
//! One row per chunk in a single table keyed by the flat-encoded key path.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use crate::adapter::StorageAdapter;
use crate::codec::{FlatCodec, KeyCodec};
use crate::config::{validate_table_name, PgConfig, PgConnection, SslMode};
use crate::error::{ChunkStoreError, Result};
use crate::key::{Chunk, StorageKey};

use super::sql::{like_prefix_pattern, Statements, SCHEMA_LOCK};

/// Chunk store backed by one PostgreSQL table
///
/// ## Consistency:
/// - `save` is a single upsert statement; concurrent writers to one key
///   resolve inside the database, last commit wins.
/// - Range deletes and point writes inside the range race at statement
///   granularity with no defined winner.
pub struct PgStorageAdapter {
    pool: PgPool,
    table: String,
    sql: Statements,
    codec: FlatCodec,
}

impl PgStorageAdapter {
    /// Build a pool from `config` and, if asked, bootstrap the schema
    pub async fn connect(config: PgConfig) -> Result<Self> {
        validate_table_name(&config.table)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect_with(connect_options(&config.connection)?)
            .await?;

        let adapter = Self::from_pool(pool, config.table)?;

        tracing::info!(table = %adapter.table, "Postgres chunk store connected");

        if config.ensure_schema {
            adapter.ensure_schema().await?;
        }

        Ok(adapter)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;

        Ok(Self {
            pool,
            sql: Statements::new(&table),
            table,
            codec: FlatCodec,
        })
    }

    /// Idempotent schema bootstrap: the chunk table plus a pattern-ops index
    /// for prefix LIKE queries.
    ///
    /// Runs in one transaction under an advisory lock, so concurrent calls
    /// from several processes serialize instead of racing on the catalog.
    /// Any failure rolls the whole transaction back.
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|source| self.schema_error(source))?;

        let applied = async {
            sqlx::query(SCHEMA_LOCK)
                .bind(&self.table)
                .execute(&mut *tx)
                .await?;
            sqlx::query(&self.sql.create_table)
                .execute(&mut *tx)
                .await?;
            sqlx::query(&self.sql.create_index)
                .execute(&mut *tx)
                .await?;
            Ok::<_, sqlx::Error>(())
        }
        .await;

        match applied {
            Ok(()) => {
                tx.commit()
                    .await
                    .map_err(|source| self.schema_error(source))?;
                tracing::info!(table = %self.table, "schema ensured");
                Ok(())
            }
            Err(source) => {
                if let Err(e) = tx.rollback().await {
                    tracing::warn!(table = %self.table, error = %e, "schema rollback failed");
                }
                Err(self.schema_error(source))
            }
        }
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(table = %self.table, "Postgres chunk store closed");
    }

    /// Get the table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn schema_error(&self, source: sqlx::Error) -> ChunkStoreError {
        ChunkStoreError::Schema {
            table: self.table.clone(),
            source,
        }
    }
}

#[async_trait]
impl StorageAdapter for PgStorageAdapter {
    async fn load(&self, key: &StorageKey) -> Result<Option<Bytes>> {
        key.ensure_point()?;
        let key_path = self.codec.encode(key);

        let data: Option<Vec<u8>> = sqlx::query_scalar(&self.sql.select)
            .bind(&key_path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(data.map(Bytes::from))
    }

    async fn save(&self, key: &StorageKey, data: Bytes) -> Result<()> {
        key.ensure_point()?;
        let key_path = self.codec.encode(key);

        sqlx::query(&self.sql.upsert)
            .bind(&key_path)
            .bind(&data[..])
            .execute(&self.pool)
            .await?;

        tracing::debug!(key = %key, bytes = data.len(), "chunk saved");
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> Result<()> {
        key.ensure_point()?;
        let key_path = self.codec.encode(key);

        let result = sqlx::query(&self.sql.delete)
            .bind(&key_path)
            .execute(&self.pool)
            .await?;

        tracing::debug!(key = %key, rows = result.rows_affected(), "chunk removed");
        Ok(())
    }

    async fn load_range(&self, prefix: &StorageKey) -> Result<Vec<Chunk>> {
        let rows: Vec<(String, Vec<u8>)> = if prefix.is_empty() {
            sqlx::query_as(&self.sql.select_all)
                .fetch_all(&self.pool)
                .await?
        } else {
            let encoded = self.codec.encode(prefix);
            sqlx::query_as(&self.sql.select_range)
                .bind(&encoded)
                .bind(like_prefix_pattern(&encoded))
                .fetch_all(&self.pool)
                .await?
        };

        let chunks = rows
            .into_iter()
            .map(|(key_path, data)| -> Result<Chunk> {
                Ok(Chunk {
                    key: self.codec.decode(&key_path)?,
                    data: Bytes::from(data),
                })
            })
            .collect::<Result<Vec<Chunk>>>()?;

        tracing::debug!(prefix = %prefix, returned = chunks.len(), "range loaded");
        Ok(chunks)
    }

    async fn remove_range(&self, prefix: &StorageKey) -> Result<()> {
        let result = if prefix.is_empty() {
            sqlx::query(&self.sql.delete_all)
                .execute(&self.pool)
                .await?
        } else {
            let encoded = self.codec.encode(prefix);
            sqlx::query(&self.sql.delete_range)
                .bind(&encoded)
                .bind(like_prefix_pattern(&encoded))
                .execute(&self.pool)
                .await?
        };

        tracing::debug!(prefix = %prefix, rows = result.rows_affected(), "range removed");
        Ok(())
    }
}

impl std::fmt::Debug for PgStorageAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStorageAdapter")
            .field("table", &self.table)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

/// Driver options for a configured connection source
fn connect_options(connection: &PgConnection) -> Result<PgConnectOptions> {
    match connection {
        PgConnection::Url { url, ssl_mode } => {
            let options: PgConnectOptions = url.parse().map_err(|e: sqlx::Error| {
                ChunkStoreError::Config(format!("invalid database URL: {}", e))
            })?;
            Ok(match ssl_mode {
                Some(mode) => options.ssl_mode(pg_ssl_mode(*mode)),
                None => options,
            })
        }
        PgConnection::Params(params) => Ok(PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.user)
            .password(&params.password)
            .database(&params.database)
            .ssl_mode(pg_ssl_mode(params.ssl_mode))),
    }
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
    }
}
