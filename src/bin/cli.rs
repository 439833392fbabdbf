//! chunkstore CLI
//!
//! Inspect and edit a chunk store from the command line. Backend settings
//! come from the environment (see `chunkstore::config`); flags override them.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use bytes::Bytes;
use chunkstore::codec::{FlatCodec, KeyCodec};
use chunkstore::config::env;
use chunkstore::{ChunkStore, ChunkStoreError, StorageAdapter, StorageKey, StoreConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// chunkstore CLI
#[derive(Parser, Debug)]
#[command(name = "chunkstore-cli")]
#[command(about = "CLI for the chunkstore hierarchical chunk store")]
#[command(version)]
struct Args {
    /// Backend to open
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Base directory (filesystem backend)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Connection string (postgres backend)
    #[arg(long)]
    database_url: Option<String>,

    /// Table name (postgres backend)
    #[arg(short, long)]
    table: Option<String>,

    /// Bootstrap the schema on connect (postgres backend)
    #[arg(long)]
    ensure_schema: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    Fs,
    Postgres,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a chunk's payload to stdout
    Get {
        /// Key segments
        #[arg(required = true)]
        key: Vec<String>,
    },

    /// Store a chunk
    Put {
        /// Key segments
        #[arg(required = true)]
        key: Vec<String>,

        /// Payload given inline
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        value: Option<String>,

        /// Payload read from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Delete one chunk
    Rm {
        /// Key segments
        #[arg(required = true)]
        key: Vec<String>,
    },

    /// List chunks under a prefix (everything if no prefix)
    Ls {
        /// Prefix segments
        prefix: Vec<String>,
    },

    /// Delete every chunk under a prefix (everything if no prefix)
    RmRange {
        /// Prefix segments
        prefix: Vec<String>,
    },

    /// Create the table and index if missing
    InitSchema,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Payloads go to stdout, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,chunkstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> chunkstore::Result<ExitCode> {
    let config = resolve_config(&args)?;
    let store = ChunkStore::open(config).await?;

    tracing::debug!("chunkstore v{} using {} backend", chunkstore::VERSION, store.backend_name());

    let code = execute(&store, args.command).await;
    store.close().await;
    code
}

async fn execute(store: &ChunkStore, command: Commands) -> chunkstore::Result<ExitCode> {
    match command {
        Commands::Get { key } => {
            let key = StorageKey::from(key);
            match store.load(&key).await? {
                Some(data) => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&data)?;
                    stdout.flush()?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    tracing::warn!("no chunk stored at {}", key);
                    Ok(ExitCode::from(2))
                }
            }
        }
        Commands::Put { key, value, file } => {
            let data = match (value, file) {
                (Some(value), _) => Bytes::from(value),
                (None, Some(path)) => Bytes::from(tokio::fs::read(path).await?),
                (None, None) => {
                    return Err(ChunkStoreError::Config(
                        "put needs --value or --file".to_string(),
                    ))
                }
            };
            store.save(&StorageKey::from(key), data).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Rm { key } => {
            store.remove(&StorageKey::from(key)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ls { prefix } => {
            let mut chunks = store.load_range(&StorageKey::from(prefix)).await?;
            chunks.sort_by(|a, b| a.key.cmp(&b.key));

            let mut stdout = std::io::stdout().lock();
            for chunk in chunks {
                // Encoded form keeps '/' inside segments unambiguous
                writeln!(stdout, "{}\t{}", FlatCodec.encode(&chunk.key), chunk.data.len())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::RmRange { prefix } => {
            store.remove_range(&StorageKey::from(prefix)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitSchema => {
            store.ensure_schema().await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Environment config with command-line flags layered on top
fn resolve_config(args: &Args) -> chunkstore::Result<StoreConfig> {
    let mut overrides: HashMap<&'static str, String> = HashMap::new();

    if let Some(backend) = args.backend {
        let name = match backend {
            Backend::Fs => "fs",
            Backend::Postgres => "postgres",
        };
        overrides.insert(env::BACKEND, name.to_string());
    }
    if let Some(dir) = &args.data_dir {
        overrides.insert(env::DATA_DIR, dir.to_string_lossy().into_owned());
    }
    if let Some(url) = &args.database_url {
        overrides.insert(env::DATABASE_URL, url.clone());
    }
    if let Some(table) = &args.table {
        overrides.insert(env::TABLE, table.clone());
    }
    if args.ensure_schema {
        overrides.insert(env::ENSURE_SCHEMA, "true".to_string());
    }

    StoreConfig::from_lookup(|name| {
        overrides
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    })
}
