//! Error types for chunkstore
//!
//! Provides a unified error type for every backend.
//!
//! A missing key is never an error: point reads return `Ok(None)`, range
//! reads return an empty `Vec`, and removals of absent keys succeed.

use thiserror::Error;

/// Result type alias using ChunkStoreError
pub type Result<T> = std::result::Result<T, ChunkStoreError>;

/// Unified error type for chunkstore operations
#[derive(Debug, Error)]
pub enum ChunkStoreError {
    // -------------------------------------------------------------------------
    // Storage Medium Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    // -------------------------------------------------------------------------
    // Schema Errors
    // -------------------------------------------------------------------------
    #[error("Schema bootstrap failed for table {table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    /// A stored form could not be decoded back into a key.
    /// Indicates corruption or a foreign file, never a missing key.
    #[error("Encoding violation: {0}")]
    Encoding(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
