//! Configuration Tests
//!
//! Tests verify:
//! - Defaults when nothing is set
//! - Backend selection and per-backend variables
//! - DATABASE_URL precedence over individual DB_* fields
//! - Rejection of malformed values
//! - Secrets stay out of Debug output

use std::collections::HashMap;
use std::path::PathBuf;

use chunkstore::config::{
    env, validate_table_name, FsConfig, PgConfig, PgConnection, PgParams, SslMode, StoreConfig,
};
use chunkstore::ChunkStoreError;

// =============================================================================
// Helper Functions
// =============================================================================

fn load(vars: &[(&str, &str)]) -> chunkstore::Result<StoreConfig> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    StoreConfig::from_lookup(|name| vars.get(name).cloned())
}

fn load_pg(vars: &[(&str, &str)]) -> PgConfig {
    let mut all = vec![(env::BACKEND, "postgres")];
    all.extend_from_slice(vars);
    match load(&all).unwrap() {
        StoreConfig::Postgres(config) => config,
        other => panic!("expected postgres config, got {other:?}"),
    }
}

fn is_config_error(result: chunkstore::Result<StoreConfig>) -> bool {
    matches!(result, Err(ChunkStoreError::Config(_)))
}

// =============================================================================
// Default Tests
// =============================================================================

#[test]
fn test_defaults_to_filesystem() {
    match load(&[]).unwrap() {
        StoreConfig::Filesystem(config) => {
            assert_eq!(config.base_dir, PathBuf::from("./chunkstore-data"));
            assert!(config.fsync);
        }
        other => panic!("expected filesystem config, got {other:?}"),
    }
}

#[test]
fn test_fs_config_builder() {
    let config = FsConfig::builder().base_dir("/tmp/chunks").fsync(false).build();

    assert_eq!(config.base_dir, PathBuf::from("/tmp/chunks"));
    assert!(!config.fsync);
}

#[test]
fn test_pg_defaults() {
    let config = PgConfig::default();

    assert_eq!(config.table, "chunk_store");
    assert!(!config.ensure_schema);
    assert_eq!(config.max_connections, 10);
    assert_eq!(config.acquire_timeout_ms, 30_000);

    let PgConnection::Params(params) = config.connection else {
        panic!("default connection should use params");
    };
    assert_eq!(params.host, "postgres");
    assert_eq!(params.port, 5432);
    assert_eq!(params.user, "postgres");
    assert_eq!(params.database, "chunkstore");
    assert_eq!(params.ssl_mode, SslMode::Disable);
}

// =============================================================================
// Environment Tests
// =============================================================================

#[test]
fn test_filesystem_variables() {
    let config = load(&[
        (env::BACKEND, "fs"),
        (env::DATA_DIR, "/var/lib/chunks"),
        (env::FSYNC, "off"),
    ])
    .unwrap();

    let StoreConfig::Filesystem(config) = config else {
        panic!("expected filesystem config");
    };
    assert_eq!(config.base_dir, PathBuf::from("/var/lib/chunks"));
    assert!(!config.fsync);
}

#[test]
fn test_backend_aliases() {
    for name in ["", "fs", "filesystem", " fs "] {
        assert!(matches!(load(&[(env::BACKEND, name)]).unwrap(), StoreConfig::Filesystem(_)));
    }
    for name in ["postgres", "pg"] {
        assert!(matches!(load(&[(env::BACKEND, name)]).unwrap(), StoreConfig::Postgres(_)));
    }
}

#[test]
fn test_database_url_wins_over_fields() {
    let config = load_pg(&[
        (env::DATABASE_URL, "postgres://u:p@db.internal:6543/chunks"),
        (env::DB_HOST, "ignored"),
        (env::DB_SSLMODE, "require"),
    ]);

    match config.connection {
        PgConnection::Url { url, ssl_mode } => {
            assert_eq!(url, "postgres://u:p@db.internal:6543/chunks");
            assert_eq!(ssl_mode, Some(SslMode::Require));
        }
        other => panic!("expected url connection, got {other:?}"),
    }
}

#[test]
fn test_individual_fields() {
    let config = load_pg(&[
        (env::DB_HOST, "db.internal"),
        (env::DB_PORT, "6543"),
        (env::DB_USER, "writer"),
        (env::DB_PASSWORD, "s3cret"),
        (env::DB_NAME, "docs"),
        (env::DB_SSLMODE, "Prefer"),
        (env::TABLE, "doc_chunks"),
        (env::ENSURE_SCHEMA, "yes"),
        (env::MAX_CONNECTIONS, "3"),
    ]);

    assert_eq!(config.table, "doc_chunks");
    assert!(config.ensure_schema);
    assert_eq!(config.max_connections, 3);

    let PgConnection::Params(params) = config.connection else {
        panic!("expected params connection");
    };
    assert_eq!(params.host, "db.internal");
    assert_eq!(params.port, 6543);
    assert_eq!(params.user, "writer");
    assert_eq!(params.password, "s3cret");
    assert_eq!(params.database, "docs");
    assert_eq!(params.ssl_mode, SslMode::Prefer);
}

#[test]
fn test_blank_values_fall_back_to_defaults() {
    let config = load_pg(&[(env::DATABASE_URL, "  "), (env::DB_HOST, ""), (env::TABLE, "")]);

    assert_eq!(config.table, "chunk_store");
    let PgConnection::Params(params) = config.connection else {
        panic!("blank DATABASE_URL should be ignored");
    };
    assert_eq!(params.host, "postgres");
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_rejects_unknown_backend() {
    assert!(is_config_error(load(&[(env::BACKEND, "sqlite")])));
}

#[test]
fn test_rejects_bad_values() {
    let postgres = (env::BACKEND, "postgres");

    assert!(is_config_error(load(&[postgres, (env::DB_PORT, "70000")])));
    assert!(is_config_error(load(&[postgres, (env::DB_PORT, "five")])));
    assert!(is_config_error(load(&[postgres, (env::DB_SSLMODE, "verify-full")])));
    assert!(is_config_error(load(&[postgres, (env::ENSURE_SCHEMA, "maybe")])));
    assert!(is_config_error(load(&[postgres, (env::MAX_CONNECTIONS, "0")])));
    assert!(is_config_error(load(&[postgres, (env::TABLE, "chunks; DROP TABLE x")])));
    assert!(is_config_error(load(&[(env::FSYNC, "sometimes")])));
}

#[test]
fn test_table_name_validation() {
    for good in ["chunk_store", "_private", "Chunks2", &"t".repeat(63)] {
        assert!(validate_table_name(good).is_ok(), "{good:?}");
    }
    for bad in ["", "2chunks", "chunk-store", "public.chunks", "chünks", &"t".repeat(64)] {
        assert!(validate_table_name(bad).is_err(), "{bad:?}");
    }
}

#[test]
fn test_ssl_mode_parsing() {
    assert_eq!("DISABLE".parse::<SslMode>().unwrap(), SslMode::Disable);
    assert_eq!(" prefer ".parse::<SslMode>().unwrap(), SslMode::Prefer);
    assert_eq!("require".parse::<SslMode>().unwrap(), SslMode::Require);
    assert!("allow".parse::<SslMode>().is_err());
}

// =============================================================================
// Debug Output Tests
// =============================================================================

#[test]
fn test_debug_redacts_secrets() {
    let url = PgConfig::builder()
        .url("postgres://u:hunter2@db/chunks")
        .build();
    let rendered = format!("{url:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("<redacted>"));

    let params = PgParams {
        password: "hunter2".to_string(),
        ..PgParams::default()
    };
    let rendered = format!("{params:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("db") || rendered.contains("postgres"));
}
