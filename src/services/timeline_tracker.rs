//! Per-project attempt log.
//!
//! Mutations apply to a project loaded by the lifecycle manager and are
//! persisted with it; reads go to the repository.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Project, TimelineEntry, TimelineStatus, TimelineUpdate};
use crate::domain::ports::ProjectRepository;

pub struct TimelineTracker<P: ProjectRepository> {
    projects: Arc<P>,
}

impl<P: ProjectRepository> Clone for TimelineTracker<P> {
    fn clone(&self) -> Self {
        Self {
            projects: Arc::clone(&self.projects),
        }
    }
}

impl<P: ProjectRepository> TimelineTracker<P> {
    pub fn new(projects: Arc<P>) -> Self {
        Self { projects }
    }

    /// Append an entry. Conflict unless it is for the next attempt.
    pub fn add_entry(&self, project: &mut Project, entry: TimelineEntry) -> DomainResult<()> {
        let timestamp = entry.timestamp;
        project.timeline.append(entry)?;
        project.updated_at = project.updated_at.max(timestamp);
        Ok(())
    }

    /// Enrich an existing entry. Conflict for unknown entries or backwards moves.
    pub fn update_entry(
        &self,
        project: &mut Project,
        entry_id: Uuid,
        update: TimelineUpdate,
    ) -> DomainResult<TimelineEntry> {
        project.timeline.update(entry_id, update).cloned()
    }

    /// Entries in attempt order.
    pub async fn get_timeline(&self, project_id: Uuid) -> DomainResult<Vec<TimelineEntry>> {
        let project = self
            .projects
            .get(project_id)
            .await?
            .ok_or(DomainError::ProjectNotFound(project_id))?;
        Ok(project.timeline.entries().to_vec())
    }

    /// Mark `attempt` as running.
    pub fn start_attempt(&self, project: &mut Project, attempt: u32, now: DateTime<Utc>) -> DomainResult<()> {
        let entry_id = Self::entry_id(project, attempt)?;
        self.update_entry(
            project,
            entry_id,
            TimelineUpdate::status(TimelineStatus::Running).started_at(now),
        )?;
        Ok(())
    }

    /// Close `attempt` with a terminal status. Duration is derived from the
    /// start time when the worker reported one.
    pub fn finish_attempt(
        &self,
        project: &mut Project,
        attempt: u32,
        status: TimelineStatus,
        error: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<TimelineEntry> {
        let entry_id = Self::entry_id(project, attempt)?;
        let mut update = TimelineUpdate::status(status).completed_at(now);
        if let Some(error) = error {
            update = update.with_error(error);
        }
        self.update_entry(project, entry_id, update)
    }

    /// Open a pending entry for `attempt`.
    pub fn open_attempt(&self, project: &mut Project, attempt: u32, now: DateTime<Utc>) -> DomainResult<()> {
        self.add_entry(project, TimelineEntry::pending(attempt, now))
    }

    fn entry_id(project: &Project, attempt: u32) -> DomainResult<Uuid> {
        project
            .timeline
            .entry_for_attempt(attempt)
            .map(|e| e.id)
            .ok_or_else(|| {
                DomainError::Conflict(format!(
                    "project {} has no timeline entry for attempt {attempt}",
                    project.id
                ))
            })
    }
}
