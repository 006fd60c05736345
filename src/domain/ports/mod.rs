//! Port trait definitions (Hexagonal Architecture)
//!
//! - ProjectRepository / BugRepository: durable records of runs and their bugs
//! - AnalysisWorker: launches the external analysis for one attempt

pub mod analysis_worker;
pub mod bug_repository;
pub mod project_repository;

pub use analysis_worker::{AnalysisWorker, WorkerRequest};
pub use bug_repository::{BugRepository, BugWrite};
pub use project_repository::{ProjectFilter, ProjectRepository};
