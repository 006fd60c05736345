use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Project, ProjectStatus};

/// Filters for listing projects
#[derive(Default, Debug, Clone)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    /// Substring match on the team name; `%` and `_` match literally
    pub team_name: Option<String>,
    pub repo_url: Option<String>,
    pub limit: Option<i64>,
}

/// Repository port for project persistence
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert a new project
    async fn create(&self, project: &Project) -> DomainResult<()>;

    /// Get a project by ID
    async fn get(&self, id: Uuid) -> DomainResult<Option<Project>>;

    /// Persist a project loaded at `project.version`.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version moved on and
    /// returns the new version otherwise.
    async fn update(&self, project: &Project) -> DomainResult<u64>;

    /// List projects ordered by creation time, oldest first
    async fn list(&self, filter: ProjectFilter) -> DomainResult<Vec<Project>>;

    /// Unfinished projects last written before `updated_before`, least recent first
    async fn list_stale(&self, updated_before: DateTime<Utc>) -> DomainResult<Vec<Project>>;

    /// Move `updated_at` forward to `at` without bumping the version.
    ///
    /// Marks progress that does not change the project row itself.
    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()>;

    /// Number of projects in each status
    async fn count_by_status(&self) -> DomainResult<HashMap<ProjectStatus, u64>>;
}
