//! Database connection and management module
//!
//! The only locally persisted state is collection bookkeeping, kept in an
//! embedded SQLite file. Entity data lives on the ledger and is never
//! stored here.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::StudioResult;

pub mod collection_repository;

pub use collection_repository::{Collection, CollectionRepository, DEFAULT_COLLECTION_COLOR};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: crate::config::DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl DatabaseConfig {
    /// Config for a database file at `path`
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}", path.as_ref().display()),
            ..Self::default()
        }
    }
}

/// Database connection manager
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (creating if needed) the database and apply the schema
    pub async fn connect(config: &DatabaseConfig) -> StudioResult<Self> {
        info!("Opening collection store: {}", config.database_url);

        if let Some(parent) = sqlite_parent_dir(&config.database_url) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| {
                warn!("Failed to open collection store: {}", e);
                e
            })?;

        let manager = Self { pool };
        manager.run_migrations().await?;
        Ok(manager)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Repository over the `collections` table
    pub fn collections(&self) -> CollectionRepository {
        CollectionRepository::new(self.pool.clone())
    }

    /// Idempotent schema setup
    pub async fn run_migrations(&self) -> StudioResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                color TEXT NOT NULL DEFAULT '#3b82f6',
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Collection store schema ready");
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(self) {
        info!("Closing collection store");
        self.pool.close().await;
    }
}

/// Directory holding the database file, if the URL names one
fn sqlite_parent_dir(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
}
