//! Opening the reposcore database.
//!
//! The CLI and a running `submit` share one database file, so file pools use
//! WAL journaling and a generous busy timeout. Tests get a private in-memory
//! database instead.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

const MEMORY_URL: &str = "sqlite::memory:";

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
    #[error("Failed to create database directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to open database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("Database did not answer: {0}")]
    Ping(#[source] sqlx::Error),
}

/// Pool sizing and lock waits.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// How long a writer waits on a lock held by another process.
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(3),
            busy_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            ..Self::default()
        }
    }
}

/// `sqlite:` URL for a database file.
pub fn database_url(path: &Path) -> String {
    format!("sqlite:{}", path.display())
}

/// File behind a `sqlite:` URL, or `None` for in-memory databases.
fn file_path(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or_default();
    (!path.is_empty() && path != ":memory:").then(|| Path::new(path))
}

/// Open a pool on `database_url`, creating the file and its directory if needed.
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();

    if let Some(dir) = file_path(database_url).and_then(Path::parent) {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|source| ConnectionError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|_| ConnectionError::InvalidUrl(database_url.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)?;

    tracing::debug!(url = database_url, max_connections = config.max_connections, "database pool opened");
    Ok(pool)
}

/// In-memory database on a single connection that never recycles, so the
/// schema lives as long as the pool.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str(MEMORY_URL)
        .map_err(|_| ConnectionError::InvalidUrl(MEMORY_URL.to_string()))?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

pub async fn ping(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(drop)
        .map_err(ConnectionError::Ping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_handles_url_forms() {
        assert_eq!(file_path("sqlite:.reposcore/reposcore.db"), Some(Path::new(".reposcore/reposcore.db")));
        assert_eq!(file_path("sqlite:///tmp/r.db?mode=rwc"), Some(Path::new("/tmp/r.db")));
        assert_eq!(file_path(MEMORY_URL), None);
    }

    #[test]
    fn test_pool_config_follows_database_section() {
        let db = DatabaseConfig {
            max_connections: 9,
            ..DatabaseConfig::default()
        };
        assert_eq!(PoolConfig::from(&db).max_connections, 9);
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("reposcore.db");

        let pool = create_pool(&database_url(&db_path), None).await.unwrap();
        ping(&pool).await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_memory_pool_is_usable() {
        let pool = create_test_pool().await.unwrap();
        ping(&pool).await.unwrap();
    }
}
