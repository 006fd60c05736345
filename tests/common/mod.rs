//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reposcore::adapters::sqlite::{
    create_migrated_test_pool, database_url, initialize_database, SqliteBugRepository, SqliteProjectRepository,
};
use reposcore::domain::models::Project;
use reposcore::domain::ports::AnalysisWorker;
use reposcore::services::{ManagerSettings, ProjectLifecycleManager, RetryPolicy, WorkerPoolConfig};
use tempfile::TempDir;
use uuid::Uuid;

pub type Manager = ProjectLifecycleManager<SqliteProjectRepository, SqliteBugRepository>;

pub const REPO_URL: &str = "https://github.com/acme/widgets";

/// Settings with no retry delay and a short worker timeout.
pub fn fast_settings() -> ManagerSettings {
    ManagerSettings {
        default_max_retries: 5,
        retry_policy: RetryPolicy::immediate(),
        base_score: 100,
        pool: WorkerPoolConfig {
            max_concurrent: 4,
            event_timeout: Duration::from_secs(10),
        },
    }
}

/// Manager over an in-memory database.
pub async fn memory_manager(worker: Arc<dyn AnalysisWorker>, settings: ManagerSettings) -> Arc<Manager> {
    let pool = create_migrated_test_pool().await.expect("test pool");
    ProjectLifecycleManager::start(
        Arc::new(SqliteProjectRepository::new(pool.clone())),
        Arc::new(SqliteBugRepository::new(pool)),
        worker,
        settings,
    )
}

/// Manager over the database at `url`, as a separate process would open it.
pub async fn open_manager(url: &str, worker: Arc<dyn AnalysisWorker>, settings: ManagerSettings) -> Arc<Manager> {
    let pool = initialize_database(url, None).await.expect("file database");
    ProjectLifecycleManager::start(
        Arc::new(SqliteProjectRepository::new(pool.clone())),
        Arc::new(SqliteBugRepository::new(pool)),
        worker,
        settings,
    )
}

/// Manager over a database file in a fresh temp directory.
pub async fn file_manager(worker: Arc<dyn AnalysisWorker>, settings: ManagerSettings) -> (TempDir, Arc<Manager>) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let manager = open_manager(&db_url(&dir), worker, settings).await;
    (dir, manager)
}

/// URL of the database file inside `dir`.
pub fn db_url(dir: &TempDir) -> String {
    database_url(&dir.path().join("reposcore.db"))
}

/// Poll until the project is terminal, panicking after `timeout`.
pub async fn wait_terminal(manager: &Manager, id: Uuid, timeout: Duration) -> Project {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let project = manager.get_project(id).await.expect("project exists");
        if project.is_terminal() {
            return project;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "project {id} still {} after {timeout:?}",
            project.status
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Initialize tracing for tests that want log output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
