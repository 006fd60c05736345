//! Port for the external process that analyses a repository.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Project, WorkerEvent};

/// Everything a worker needs to run one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerRequest {
    pub project_id: Uuid,
    pub repo_url: String,
    pub team_name: String,
    pub leader_name: String,
    pub branch_name: String,
    pub attempt: u32,
    pub max_retries: u32,
}

impl WorkerRequest {
    pub fn for_attempt(project: &Project, attempt: u32) -> Self {
        Self {
            project_id: project.id,
            repo_url: project.repo_url.clone(),
            team_name: project.team_name.clone(),
            leader_name: project.leader_name.clone(),
            branch_name: project.branch_name.clone(),
            attempt,
            max_retries: project.max_retries,
        }
    }
}

/// An analysis worker runs one attempt and reports typed events.
///
/// `start` resolves when the worker has exited. An `Err` means the worker
/// could not be launched or ended abnormally without reporting; the caller
/// turns it into a failure of the attempt. Dropping the returned future must
/// stop the worker.
#[async_trait]
pub trait AnalysisWorker: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn start(
        &self,
        request: WorkerRequest,
        events: mpsc::Sender<WorkerEvent>,
    ) -> DomainResult<()>;
}
