use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Bug, BugStatus, BugType};

/// What [`BugRepository::record`] did with a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BugWrite {
    Inserted,
    /// A pending bug reached its terminal status
    StatusUpdated,
    /// Redelivery of a bug already stored in this state
    Unchanged,
}

/// Repository port for bug persistence
#[async_trait]
pub trait BugRepository: Send + Sync {
    /// Insert a bug, or move a stored pending bug to a terminal status.
    ///
    /// Recording a known id under a different project is a `Conflict`.
    async fn record(&self, bug: &Bug) -> DomainResult<BugWrite>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Bug>>;

    /// Bugs of one project in the order they were detected
    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Bug>>;

    async fn count_by_status(&self) -> DomainResult<HashMap<BugStatus, u64>>;

    async fn count_by_type(&self) -> DomainResult<HashMap<BugType, u64>>;
}
