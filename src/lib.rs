//! Reposcore - repository analysis job orchestrator
//!
//! Reposcore accepts analysis jobs for source repositories, hands each
//! attempt to an external worker, retries failed attempts up to a per-job
//! budget, records an attempt timeline and the bugs the worker reports, and
//! scores every successful run.
//!
//! # Architecture
//!
//! The crate follows Hexagonal Architecture:
//!
//! - **Domain Layer** (`domain`): models, lifecycle rules and port traits
//! - **Adapters** (`adapters`): SQLite repositories and analysis workers
//! - **Service Layer** (`services`): lifecycle manager and its collaborators
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reposcore::adapters::sqlite::{initialize_database, SqliteBugRepository, SqliteProjectRepository};
//! use reposcore::adapters::workers::{ProcessWorker, ProcessWorkerConfig};
//! use reposcore::services::{ManagerSettings, ProjectLifecycleManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_database("sqlite:reposcore.db", None).await?;
//!     let manager = ProjectLifecycleManager::start(
//!         Arc::new(SqliteProjectRepository::new(pool.clone())),
//!         Arc::new(SqliteBugRepository::new(pool)),
//!         Arc::new(ProcessWorker::new(ProcessWorkerConfig::default())),
//!         ManagerSettings::default(),
//!     );
//!     let project = manager
//!         .create_project("https://github.com/acme/widgets", "Acme", "Jo", None)
//!         .await?;
//!     println!("submitted {}", project.id);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Bug, BugStatus, BugType, Config, Project, ProjectStatus, RunSummary, TimelineEntry,
    TimelineStatus, WorkerEvent, WorkerEventKind,
};
pub use domain::ports::{AnalysisWorker, BugRepository, ProjectFilter, ProjectRepository, WorkerRequest};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BranchNameGenerator, EventOutcome, ManagerSettings, ProjectLifecycleManager, ScoreCalculator,
};
