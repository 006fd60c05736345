//! Typed events emitted by analysis workers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bug::Bug;
use super::project::RunSummary;

/// Result payload of a successful attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub commit_count: u32,
    pub summary: RunSummary,
}

/// What happened during an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerEventKind {
    Started,
    BugDetected { bug: Bug },
    Completed { report: CompletionReport },
    Failed { error: String },
}

impl WorkerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::BugDetected { .. } => "bug_detected",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }

    /// Completed and Failed end an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// An event for one attempt of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerEvent {
    pub project_id: Uuid,
    pub attempt: u32,
    #[serde(flatten)]
    pub kind: WorkerEventKind,
}

/// Identity used to drop redelivered events.
///
/// Bug events also carry the bug id so distinct bugs of one attempt are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub project_id: Uuid,
    pub attempt: u32,
    pub kind: &'static str,
    pub bug_id: Option<Uuid>,
}

impl WorkerEvent {
    pub fn new(project_id: Uuid, attempt: u32, kind: WorkerEventKind) -> Self {
        Self {
            project_id,
            attempt,
            kind,
        }
    }

    pub fn started(project_id: Uuid, attempt: u32) -> Self {
        Self::new(project_id, attempt, WorkerEventKind::Started)
    }

    pub fn bug_detected(project_id: Uuid, attempt: u32, bug: Bug) -> Self {
        Self::new(project_id, attempt, WorkerEventKind::BugDetected { bug })
    }

    pub fn completed(project_id: Uuid, attempt: u32, commit_count: u32, summary: RunSummary) -> Self {
        Self::new(
            project_id,
            attempt,
            WorkerEventKind::Completed {
                report: CompletionReport {
                    commit_count,
                    summary,
                },
            },
        )
    }

    pub fn failed(project_id: Uuid, attempt: u32, error: impl Into<String>) -> Self {
        Self::new(
            project_id,
            attempt,
            WorkerEventKind::Failed {
                error: error.into(),
            },
        )
    }

    pub fn key(&self) -> EventKey {
        let bug_id = match &self.kind {
            WorkerEventKind::BugDetected { bug } => Some(bug.id),
            _ => None,
        };
        EventKey {
            project_id: self.project_id,
            attempt: self.attempt,
            kind: self.kind.as_str(),
            bug_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::bug::BugType;

    #[test]
    fn test_key_distinguishes_bugs_within_attempt() {
        let pid = Uuid::new_v4();
        let a = WorkerEvent::bug_detected(pid, 1, Bug::new(pid, "a.py", BugType::Logic, 1, "x"));
        let b = WorkerEvent::bug_detected(pid, 1, Bug::new(pid, "b.py", BugType::Logic, 2, "y"));
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
    }

    #[test]
    fn test_key_ignores_payload_for_terminal_events() {
        let pid = Uuid::new_v4();
        let first = WorkerEvent::failed(pid, 2, "timeout");
        let second = WorkerEvent::failed(pid, 2, "different text");
        assert_eq!(first.key(), second.key());
        assert_ne!(first.key(), WorkerEvent::failed(pid, 3, "timeout").key());
        assert!(first.is_terminal());
        assert!(!WorkerEvent::started(pid, 1).is_terminal());
    }
}
