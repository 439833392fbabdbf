//! Configuration for chunkstore
//!
//! Centralized configuration with sensible defaults, readable from the
//! process environment.
//!
//! ## Environment
//! ```text
//! CHUNKSTORE_BACKEND          fs | postgres                (default fs)
//! CHUNKSTORE_DATA_DIR         filesystem base directory    (default ./chunkstore-data)
//! CHUNKSTORE_FSYNC            fsync each chunk write       (default true)
//! DATABASE_URL                full connection string; wins over DB_* fields
//! DB_HOST DB_PORT DB_USER DB_PASSWORD DB_NAME DB_SSLMODE
//! CHUNKSTORE_TABLE            table name                   (default chunk_store)
//! CHUNKSTORE_ENSURE_SCHEMA    bootstrap schema on connect  (default false)
//! CHUNKSTORE_MAX_CONNECTIONS  pool size                    (default 10)
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::error::{ChunkStoreError, Result};

/// Environment variable names
pub mod env {
    pub const BACKEND: &str = "CHUNKSTORE_BACKEND";
    pub const DATA_DIR: &str = "CHUNKSTORE_DATA_DIR";
    pub const FSYNC: &str = "CHUNKSTORE_FSYNC";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const DB_HOST: &str = "DB_HOST";
    pub const DB_PORT: &str = "DB_PORT";
    pub const DB_USER: &str = "DB_USER";
    pub const DB_PASSWORD: &str = "DB_PASSWORD";
    pub const DB_NAME: &str = "DB_NAME";
    pub const DB_SSLMODE: &str = "DB_SSLMODE";
    pub const TABLE: &str = "CHUNKSTORE_TABLE";
    pub const ENSURE_SCHEMA: &str = "CHUNKSTORE_ENSURE_SCHEMA";
    pub const MAX_CONNECTIONS: &str = "CHUNKSTORE_MAX_CONNECTIONS";
}

// =============================================================================
// Backend Selection
// =============================================================================

/// Which backend to open, with its settings
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Filesystem(FsConfig),
    Postgres(PgConfig),
}

impl StoreConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(env::BACKEND).as_deref().map(str::trim) {
            None | Some("") | Some("fs") | Some("filesystem") => {
                FsConfig::from_lookup(&lookup).map(Self::Filesystem)
            }
            Some("postgres") | Some("pg") => PgConfig::from_lookup(&lookup).map(Self::Postgres),
            Some(other) => Err(ChunkStoreError::Config(format!(
                "{} must be 'fs' or 'postgres', got {:?}",
                env::BACKEND,
                other
            ))),
        }
    }
}

// =============================================================================
// Filesystem Configuration
// =============================================================================

/// Settings for the filesystem backend
#[derive(Debug, Clone)]
pub struct FsConfig {
    /// Root of the chunk tree
    /// Internal structure:
    ///   {base_dir}/
    ///     └── {shard}/{rest of first segment}/{segment}/.../{last segment}
    pub base_dir: PathBuf,

    /// fsync each chunk file before renaming it into place
    pub fsync: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./chunkstore-data"),
            fsync: true,
        }
    }
}

impl FsConfig {
    /// Create a new config builder
    pub fn builder() -> FsConfigBuilder {
        FsConfigBuilder::default()
    }

    fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = non_empty(lookup(env::DATA_DIR)) {
            config.base_dir = PathBuf::from(dir);
        }
        if let Some(flag) = non_empty(lookup(env::FSYNC)) {
            config.fsync = parse_bool(env::FSYNC, &flag)?;
        }
        Ok(config)
    }
}

/// Builder for FsConfig
#[derive(Default)]
pub struct FsConfigBuilder {
    config: FsConfig,
}

impl FsConfigBuilder {
    /// Set the base directory
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Enable or disable fsync on every chunk write
    pub fn fsync(mut self, fsync: bool) -> Self {
        self.config.fsync = fsync;
        self
    }

    pub fn build(self) -> FsConfig {
        self.config
    }
}

// =============================================================================
// PostgreSQL Configuration
// =============================================================================

/// Settings for the relational backend
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Where to connect
    pub connection: PgConnection,

    /// Table holding one row per chunk
    pub table: String,

    /// Run the idempotent schema bootstrap when connecting
    pub ensure_schema: bool,

    /// Max pooled connections
    pub max_connections: u32,

    /// How long to wait for a pooled connection (milliseconds)
    pub acquire_timeout_ms: u64,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            connection: PgConnection::Params(PgParams::default()),
            table: "chunk_store".to_string(),
            ensure_schema: false,
            max_connections: 10,
            acquire_timeout_ms: 30_000,
        }
    }
}

impl PgConfig {
    /// Create a new config builder
    pub fn builder() -> PgConfigBuilder {
        PgConfigBuilder::default()
    }

    fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ssl_mode = match non_empty(lookup(env::DB_SSLMODE)) {
            Some(mode) => Some(mode.parse::<SslMode>()?),
            None => None,
        };

        let connection = match non_empty(lookup(env::DATABASE_URL)) {
            Some(url) => PgConnection::Url { url, ssl_mode },
            None => {
                let defaults = PgParams::default();
                let port = match non_empty(lookup(env::DB_PORT)) {
                    Some(port) => port.parse::<u16>().map_err(|_| {
                        ChunkStoreError::Config(format!(
                            "{} must be a port number, got {:?}",
                            env::DB_PORT,
                            port
                        ))
                    })?,
                    None => defaults.port,
                };
                PgConnection::Params(PgParams {
                    host: non_empty(lookup(env::DB_HOST)).unwrap_or(defaults.host),
                    port,
                    user: non_empty(lookup(env::DB_USER)).unwrap_or(defaults.user),
                    password: lookup(env::DB_PASSWORD).unwrap_or(defaults.password),
                    database: non_empty(lookup(env::DB_NAME)).unwrap_or(defaults.database),
                    ssl_mode: ssl_mode.unwrap_or(defaults.ssl_mode),
                })
            }
        };

        let mut config = Self {
            connection,
            ..Self::default()
        };

        if let Some(table) = non_empty(lookup(env::TABLE)) {
            validate_table_name(&table)?;
            config.table = table;
        }
        if let Some(flag) = non_empty(lookup(env::ENSURE_SCHEMA)) {
            config.ensure_schema = parse_bool(env::ENSURE_SCHEMA, &flag)?;
        }
        if let Some(count) = non_empty(lookup(env::MAX_CONNECTIONS)) {
            config.max_connections = count.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ChunkStoreError::Config(format!(
                    "{} must be a positive integer, got {:?}",
                    env::MAX_CONNECTIONS,
                    count
                ))
            })?;
        }

        Ok(config)
    }
}

/// Builder for PgConfig
#[derive(Default)]
pub struct PgConfigBuilder {
    config: PgConfig,
}

impl PgConfigBuilder {
    /// Connect with a single connection string
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.connection = PgConnection::Url {
            url: url.into(),
            ssl_mode: None,
        };
        self
    }

    /// Connect with individual fields
    pub fn params(mut self, params: PgParams) -> Self {
        self.config.connection = PgConnection::Params(params);
        self
    }

    /// Set the table name
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.config.table = table.into();
        self
    }

    /// Run the schema bootstrap on connect
    pub fn ensure_schema(mut self, ensure: bool) -> Self {
        self.config.ensure_schema = ensure;
        self
    }

    /// Set the pool size
    pub fn max_connections(mut self, count: u32) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the pool acquire timeout (in milliseconds)
    pub fn acquire_timeout_ms(mut self, ms: u64) -> Self {
        self.config.acquire_timeout_ms = ms;
        self
    }

    pub fn build(self) -> PgConfig {
        self.config
    }
}

/// Connection source for the relational backend
#[derive(Clone)]
pub enum PgConnection {
    /// Full connection string; `ssl_mode` overrides any sslmode it carries
    Url {
        url: String,
        ssl_mode: Option<SslMode>,
    },
    /// Individual fields
    Params(PgParams),
}

impl fmt::Debug for PgConnection {
    // Connection strings usually embed a password.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url { ssl_mode, .. } => f
                .debug_struct("Url")
                .field("url", &"<redacted>")
                .field("ssl_mode", ssl_mode)
                .finish(),
            Self::Params(params) => f.debug_tuple("Params").field(params).finish(),
        }
    }
}

/// Individual connection fields
#[derive(Clone)]
pub struct PgParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: SslMode,
}

impl Default for PgParams {
    fn default() -> Self {
        Self {
            host: "postgres".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "chunkstore".to_string(),
            ssl_mode: SslMode::Disable,
        }
    }
}

impl fmt::Debug for PgParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// TLS policy for database connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    /// Plain TCP only
    Disable,
    /// TLS if the server offers it
    Prefer,
    /// TLS or fail; the certificate is not verified
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = ChunkStoreError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "prefer" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            other => Err(ChunkStoreError::Config(format!(
                "{} must be disable, prefer or require, got {:?}",
                env::DB_SSLMODE,
                other
            ))),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Table names are spliced into SQL text, so only plain identifiers pass:
/// ASCII letter or underscore first, then letters, digits, underscores,
/// at most 63 bytes (the PostgreSQL identifier limit).
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= 63 {
        Ok(())
    } else {
        Err(ChunkStoreError::Config(format!(
            "table name {:?} is not a plain SQL identifier",
            name
        )))
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ChunkStoreError::Config(format!(
            "{} must be a boolean, got {:?}",
            name, other
        ))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
