//! Project domain model.
//!
//! A project is one submitted repository analysis job together with the full
//! history of its attempts. It is created once and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::timeline::{Timeline, TimelineEntry};
use crate::domain::errors::{DomainError, DomainResult};

/// Longest repository URL accepted at submission.
pub const MAX_REPO_URL_LEN: usize = 512;
/// Longest team or leader name accepted at submission.
pub const MAX_NAME_LEN: usize = 100;

/// Default retry budget for a new project.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Characters that are never valid inside a repository URL handed to a worker.
const FORBIDDEN_URL_CHARS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '<', '>', '"', '\'', '\\'];

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Waiting for the worker to pick up the current attempt
    Pending,
    /// The worker reported that the current attempt started
    Running,
    /// Analysis finished and the run was scored
    Completed,
    /// Retries exhausted or cancelled
    Failed,
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" | "processing" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid transitions from this status.
    ///
    /// `Pending -> Failed` covers retry exhaustion before the worker ever
    /// reported a start, and cancellation of a queued project.
    pub fn valid_transitions(&self) -> Vec<ProjectStatus> {
        match self {
            Self::Pending => vec![Self::Running, Self::Failed],
            Self::Running => vec![Self::Completed, Self::Pending, Self::Failed],
            Self::Completed | Self::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }

    pub fn all() -> [ProjectStatus; 4] {
        [Self::Pending, Self::Running, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result reported by the worker when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(alias = "totalFiles")]
    pub total_files: u32,
    #[serde(alias = "totalErrors")]
    pub total_errors: u32,
    #[serde(alias = "fixedErrors")]
    pub fixed_errors: u32,
}

impl RunSummary {
    pub fn new(total_files: u32, total_errors: u32, fixed_errors: u32) -> Self {
        Self {
            total_files,
            total_errors,
            fixed_errors,
        }
    }

    /// Fixed errors, never more than the total.
    pub fn clamped_fixed_errors(&self) -> u32 {
        self.fixed_errors.min(self.total_errors)
    }
}

/// A submitted repository analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub repo_url: String,
    pub team_name: String,
    pub leader_name: String,
    pub branch_name: String,
    pub status: ProjectStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub commit_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub timeline: Timeline,
    pub summary: Option<RunSummary>,
    pub score: Option<u32>,
    /// Last error of a terminally failed project.
    pub failure_reason: Option<String>,
    /// Version for optimistic locking.
    pub version: u64,
}

impl Project {
    /// Create a pending project with the first attempt already on its timeline.
    ///
    /// Inputs are expected to be validated already; see [`validate_repo_url`]
    /// and [`validate_name`].
    pub fn new(
        repo_url: impl Into<String>,
        team_name: impl Into<String>,
        leader_name: impl Into<String>,
        branch_name: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        let mut timeline = Timeline::default();
        timeline.push_unchecked(TimelineEntry::pending(1, now));

        Self {
            id: Uuid::new_v4(),
            repo_url: repo_url.into(),
            team_name: team_name.into(),
            leader_name: leader_name.into(),
            branch_name: branch_name.into(),
            status: ProjectStatus::Pending,
            retry_count: 0,
            max_retries,
            commit_count: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            timeline,
            summary: None,
            score: None,
            failure_reason: None,
            version: 1,
        }
    }

    /// Attempt currently in flight, numbered from 1.
    pub fn current_attempt(&self) -> u32 {
        self.retry_count + 1
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    pub fn can_transition_to(&self, new_status: ProjectStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to a new status, stamping `completed_at` on terminal states.
    pub fn transition_to(&mut self, new_status: ProjectStatus, now: DateTime<Utc>) -> Result<(), String> {
        if !self.can_transition_to(new_status) {
            return Err(format!(
                "Cannot transition from {} to {}",
                self.status.as_str(),
                new_status.as_str()
            ));
        }

        self.status = new_status;
        self.updated_at = now;
        if new_status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Seconds from submission to completion, or 0 while unfinished.
    pub fn elapsed_secs(&self) -> i64 {
        self.completed_at
            .map_or(0, |done| (done - self.created_at).num_seconds())
    }

    /// Check the invariants every persisted project must hold.
    pub fn validate(&self) -> Result<(), String> {
        if self.branch_name.is_empty() {
            return Err("Branch name cannot be empty".to_string());
        }
        if self.retry_count > self.max_retries {
            return Err(format!(
                "retry_count {} exceeds max_retries {}",
                self.retry_count, self.max_retries
            ));
        }
        if self.timeline.max_attempt() != self.current_attempt() {
            return Err(format!(
                "timeline ends at attempt {} but current attempt is {}",
                self.timeline.max_attempt(),
                self.current_attempt()
            ));
        }
        Ok(())
    }
}

/// Validate and trim a repository URL.
///
/// Accepts `scheme://host/path` for http, https, git and ssh, and the scp-like
/// `git@host:owner/repo` form.
pub fn validate_repo_url(raw: &str) -> DomainResult<String> {
    let url = raw.trim();
    let invalid = |reason: &str| Err(DomainError::validation("repo_url", reason));

    if url.is_empty() {
        return invalid("must not be empty");
    }
    if url.len() > MAX_REPO_URL_LEN {
        return invalid("is too long");
    }
    if url.chars().any(char::is_whitespace) || url.contains(FORBIDDEN_URL_CHARS) {
        return invalid("contains forbidden characters");
    }

    if let Some(rest) = url.strip_prefix("git@") {
        return match rest.split_once(':') {
            Some((host, path)) if is_host(host) && path.contains('/') => Ok(url.to_string()),
            _ => invalid("is not a valid git@host:owner/repo address"),
        };
    }

    let Some((scheme, rest)) = url.split_once("://") else {
        return invalid("is not URL-shaped");
    };
    if !matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https" | "git" | "ssh") {
        return invalid("must use http, https, git or ssh");
    }

    let authority = rest.split('/').next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    if !is_host(host) {
        return invalid("has no host");
    }
    Ok(url.to_string())
}

fn is_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Validate and trim a team or leader name.
pub fn validate_name(field: &str, raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(
            field,
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::timeline::TimelineStatus;

    fn project() -> Project {
        Project::new(
            "https://github.com/acme/widgets",
            "Acme",
            "Jo",
            "ACME_JO_AI_Fix",
            DEFAULT_MAX_RETRIES,
        )
    }

    #[test]
    fn test_new_project_starts_pending_with_first_attempt() {
        let p = project();
        assert_eq!(p.status, ProjectStatus::Pending);
        assert_eq!(p.retry_count, 0);
        assert_eq!(p.current_attempt(), 1);
        assert_eq!(p.timeline.len(), 1);
        let entry = &p.timeline.entries()[0];
        assert_eq!(entry.attempt, 1);
        assert_eq!(entry.status, TimelineStatus::Pending);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_status_transitions() {
        assert!(ProjectStatus::Pending.can_transition_to(ProjectStatus::Running));
        assert!(ProjectStatus::Running.can_transition_to(ProjectStatus::Pending));
        assert!(ProjectStatus::Running.can_transition_to(ProjectStatus::Completed));
        assert!(!ProjectStatus::Pending.can_transition_to(ProjectStatus::Completed));
        assert!(ProjectStatus::Completed.valid_transitions().is_empty());
        assert!(ProjectStatus::Failed.valid_transitions().is_empty());
    }

    #[test]
    fn test_terminal_transition_sets_completed_at_once() {
        let mut p = project();
        let now = Utc::now();
        p.transition_to(ProjectStatus::Running, now).unwrap();
        assert!(p.completed_at.is_none());
        p.transition_to(ProjectStatus::Completed, now).unwrap();
        assert_eq!(p.completed_at, Some(now));
        assert!(p.transition_to(ProjectStatus::Failed, Utc::now()).is_err());
        assert_eq!(p.completed_at, Some(now));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(ProjectStatus::from_str("RUNNING"), Some(ProjectStatus::Running));
        assert_eq!(ProjectStatus::from_str("processing"), Some(ProjectStatus::Running));
        assert_eq!(ProjectStatus::from_str("done"), None);
    }

    #[test]
    fn test_validate_repo_url_accepts_common_forms() {
        for url in [
            "https://github.com/acme/widgets",
            "https://github.com/acme/widgets.git",
            "http://gitlab.example.org:8080/group/repo",
            "ssh://git@github.com/acme/widgets.git",
            "git@github.com:acme/widgets.git",
            "  https://github.com/acme/widgets  ",
        ] {
            assert!(validate_repo_url(url).is_ok(), "{url} should be valid");
        }
        assert_eq!(
            validate_repo_url(" https://github.com/a/b ").unwrap(),
            "https://github.com/a/b"
        );
    }

    #[test]
    fn test_validate_repo_url_rejects_garbage() {
        for url in [
            "",
            "   ",
            "not a url",
            "github.com/acme/widgets",
            "ftp://example.com/repo",
            "https:///nohost",
            "https://github.com/acme/widgets;rm -rf",
            "git@github.com",
        ] {
            let err = validate_repo_url(url).unwrap_err();
            assert!(
                matches!(err, DomainError::Validation { ref field, .. } if field == "repo_url"),
                "{url} should be rejected"
            );
        }
        let long = format!("https://github.com/{}", "a".repeat(MAX_REPO_URL_LEN));
        assert!(validate_repo_url(&long).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("team_name", "  Acme ").unwrap(), "Acme");
        assert!(validate_name("team_name", "  ").is_err());
        assert!(validate_name("leader_name", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_summary_clamps_fixed_errors() {
        assert_eq!(RunSummary::new(3, 2, 5).clamped_fixed_errors(), 2);
        let parsed: RunSummary =
            serde_json::from_str(r#"{"totalFiles":4,"totalErrors":3,"fixedErrors":1}"#).unwrap();
        assert_eq!(parsed, RunSummary::new(4, 3, 1));
    }
}
