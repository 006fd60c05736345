//! Shared setup for commands that touch the database.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteBugRepository, SqliteProjectRepository};
use crate::adapters::workers::{ProcessWorker, ProcessWorkerConfig};
use crate::domain::models::Config;
use crate::services::{ManagerSettings, ProjectLifecycleManager};

/// Manager wired to SQLite storage.
pub type SqliteManager = ProjectLifecycleManager<SqliteProjectRepository, SqliteBugRepository>;

/// Open database plus the repositories built on it.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub projects: Arc<SqliteProjectRepository>,
    pub bugs: Arc<SqliteBugRepository>,
}

impl AppContext {
    /// Open the configured database, applying pending migrations.
    pub async fn open(config: &Config) -> Result<Self> {
        let path = config.database.path.trim_start_matches("sqlite:");
        if path != ":memory:" && !Path::new(path).exists() {
            anyhow::bail!("Database not found at {path}. Run 'reposcore init' first.");
        }

        let pool = initialize_database(
            &config.database.url(),
            Some(PoolConfig::from(&config.database)),
        )
        .await
        .context("Failed to open database")?;

        Ok(Self {
            config: config.clone(),
            projects: Arc::new(SqliteProjectRepository::new(pool.clone())),
            bugs: Arc::new(SqliteBugRepository::new(pool.clone())),
            pool,
        })
    }

    /// Start a manager that launches the configured worker process.
    pub fn manager(&self) -> Arc<SqliteManager> {
        let worker = ProcessWorker::new(ProcessWorkerConfig::from(&self.config.worker));
        ProjectLifecycleManager::start(
            Arc::clone(&self.projects),
            Arc::clone(&self.bugs),
            Arc::new(worker),
            ManagerSettings::from(&self.config),
        )
    }

    /// Start a manager for a command that runs workers until they finish.
    ///
    /// Unlike [`Self::manager`], it also runs the recovery loop, which keeps
    /// this process's projects fresh and picks up projects abandoned by a
    /// process that died.
    pub fn runner(&self) -> Arc<SqliteManager> {
        let manager = self.manager();
        manager.spawn_recovery_loop();
        manager
    }
}
