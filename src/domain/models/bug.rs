//! Bug records reported by analysis workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Category of a detected bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BugType {
    Linting,
    Syntax,
    Logic,
    TypeError,
    Import,
    Indentation,
}

impl BugType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linting => "LINTING",
            Self::Syntax => "SYNTAX",
            Self::Logic => "LOGIC",
            Self::TypeError => "TYPE_ERROR",
            Self::Import => "IMPORT",
            Self::Indentation => "INDENTATION",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LINTING" => Some(Self::Linting),
            "SYNTAX" => Some(Self::Syntax),
            "LOGIC" => Some(Self::Logic),
            "TYPE_ERROR" => Some(Self::TypeError),
            "IMPORT" => Some(Self::Import),
            "INDENTATION" => Some(Self::Indentation),
            _ => None,
        }
    }
}

impl fmt::Display for BugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fix status of a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugStatus {
    Pending,
    Fixed,
    Failed,
}

impl Default for BugStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl BugStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fixed => "fixed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "fixed" => Some(Self::Fixed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Position in listings: fixed, then pending, then failed.
    pub fn display_rank(&self) -> u8 {
        match self {
            Self::Fixed => 0,
            Self::Pending => 1,
            Self::Failed => 2,
        }
    }
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bug found in a project's repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_path: String,
    pub bug_type: BugType,
    pub line_number: u32,
    pub error_message: String,
    pub fix_applied: Option<String>,
    pub status: BugStatus,
    pub created_at: DateTime<Utc>,
}

impl Bug {
    pub fn new(
        project_id: Uuid,
        file_path: impl Into<String>,
        bug_type: BugType,
        line_number: u32,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            file_path: file_path.into(),
            bug_type,
            line_number,
            error_message: error_message.into(),
            fix_applied: None,
            status: BugStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Record the applied fix and mark the bug fixed.
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix_applied = Some(fix.into());
        self.status = BugStatus::Fixed;
        self
    }

    pub fn with_status(mut self, status: BugStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}
