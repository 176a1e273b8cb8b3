// ABOUTME: Database connection management and storage initialization
// ABOUTME: Provides the shared SQLite pool, migrations, and the startup capability probe

use serde::Serialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod capabilities;

pub use capabilities::StorageCapabilities;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Pool settings resolved from configuration
#[derive(Debug, Clone, Serialize)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub run_migrations: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: format!(
                "sqlite:{}",
                backstage_core::default_database_path().display()
            ),
            max_connections: 10,
            acquire_timeout_seconds: 30,
            run_migrations: true,
        }
    }
}

/// Database handle created once at startup and shared by every request
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
    pub capabilities: StorageCapabilities,
}

impl Database {
    /// Connect, configure SQLite, optionally migrate, then probe capabilities
    pub async fn connect(config: &StorageConfig) -> StorageResult<Self> {
        if let Some(path) = sqlite_file_path(&config.database_url) {
            if let Some(parent) = std::path::Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        debug!("Connecting to database: {}", config.database_url);

        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        info!("Database connection established");

        if config.run_migrations {
            migrate(&pool).await?;
            debug!("Database migrations completed");
        } else {
            warn!("Skipping migrations; schema is expected to be provisioned externally");
        }

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and probe which optional tables are present
    pub async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        let capabilities = StorageCapabilities::probe(&pool).await?;
        info!(
            chat_transcripts = capabilities.chat_transcripts,
            "Storage capabilities detected"
        );
        Ok(Self { pool, capabilities })
    }
}

/// Run the embedded migrations
pub async fn migrate(pool: &SqlitePool) -> StorageResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Single-connection in-memory pool with all migrations applied
#[cfg(any(test, feature = "test-utils"))]
pub async fn memory_pool() -> StorageResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // One connection only: each in-memory connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

fn sqlite_file_path(database_url: &str) -> Option<String> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(path.to_string())
    }
}
