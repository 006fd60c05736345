//! Attempt timeline.
//!
//! One entry per attempt, appended in attempt order and enriched in place as
//! the attempt progresses. Entries are never reordered or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Status of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl TimelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Statuses only move forward: pending, running, then success or failed.
    pub fn can_advance_to(&self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Failed),
            Self::Running => matches!(next, Self::Success | Self::Failed),
            Self::Success | Self::Failed => false,
        }
    }
}

impl fmt::Display for TimelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub status: TimelineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TimelineEntry {
    /// A fresh pending entry for `attempt`.
    pub fn pending(attempt: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            attempt,
            timestamp,
            status: TimelineStatus::Pending,
            duration_ms: None,
            error: None,
            started_at: None,
            completed_at: None,
        }
    }
}

/// Partial update applied to an existing entry.
///
/// `None` fields leave the entry untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineUpdate {
    pub status: Option<TimelineStatus>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TimelineUpdate {
    pub fn status(status: TimelineStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}

/// Ordered list of attempts for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest attempt recorded, 0 when empty.
    pub fn max_attempt(&self) -> u32 {
        self.entries.last().map_or(0, |e| e.attempt)
    }

    pub fn latest(&self) -> Option<&TimelineEntry> {
        self.entries.last()
    }

    pub fn entry_for_attempt(&self, attempt: u32) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.attempt == attempt)
    }

    /// Append an entry for the next attempt.
    pub fn append(&mut self, entry: TimelineEntry) -> DomainResult<()> {
        let expected = self.max_attempt() + 1;
        if entry.attempt != expected {
            return Err(DomainError::Conflict(format!(
                "timeline entry for attempt {} rejected, next attempt is {}",
                entry.attempt, expected
            )));
        }
        if self.entries.iter().any(|e| e.id == entry.id) {
            return Err(DomainError::Conflict(format!(
                "timeline entry {} already exists",
                entry.id
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Enrich an existing entry. Never changes its id or attempt.
    pub fn update(&mut self, entry_id: Uuid, update: TimelineUpdate) -> DomainResult<&TimelineEntry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| DomainError::Conflict(format!("timeline entry {entry_id} not found")))?;

        if let Some(next) = update.status {
            if next != entry.status && !entry.status.can_advance_to(next) {
                return Err(DomainError::Conflict(format!(
                    "attempt {} cannot move from {} to {}",
                    entry.attempt, entry.status, next
                )));
            }
            entry.status = next;
        }
        if let Some(at) = update.started_at {
            entry.started_at.get_or_insert(at);
        }
        if let Some(at) = update.completed_at {
            entry.completed_at.get_or_insert(at);
        }
        if let Some(error) = update.error {
            entry.error = Some(error);
        }

        if let Some(duration_ms) = update.duration_ms {
            entry.duration_ms = Some(duration_ms);
        } else if entry.duration_ms.is_none() && entry.status.is_terminal() {
            if let Some(done) = entry.completed_at {
                let start = entry.started_at.unwrap_or(entry.timestamp);
                let millis = (done - start).num_milliseconds().max(0);
                entry.duration_ms = u64::try_from(millis).ok();
            }
        }

        Ok(entry)
    }

    /// Push without the ordering check. Only for building a project's first entry.
    pub(crate) fn push_unchecked(&mut self, entry: TimelineEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn timeline_with_first() -> (Timeline, Uuid) {
        let mut t = Timeline::default();
        let entry = TimelineEntry::pending(1, Utc::now());
        let id = entry.id;
        t.append(entry).unwrap();
        (t, id)
    }

    #[test]
    fn test_append_requires_next_attempt() {
        let (mut t, _) = timeline_with_first();
        assert!(matches!(
            t.append(TimelineEntry::pending(1, Utc::now())),
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            t.append(TimelineEntry::pending(3, Utc::now())),
            Err(DomainError::Conflict(_))
        ));
        t.append(TimelineEntry::pending(2, Utc::now())).unwrap();
        assert_eq!(t.max_attempt(), 2);
    }

    #[test]
    fn test_empty_timeline_starts_at_attempt_one() {
        let mut t = Timeline::default();
        assert!(t.append(TimelineEntry::pending(2, Utc::now())).is_err());
        assert!(t.append(TimelineEntry::pending(1, Utc::now())).is_ok());
    }

    #[test]
    fn test_update_enriches_without_touching_identity() {
        let (mut t, id) = timeline_with_first();
        let start = Utc::now();
        t.update(id, TimelineUpdate::status(TimelineStatus::Running).started_at(start))
            .unwrap();

        let done = start + Duration::milliseconds(1500);
        let entry = t
            .update(
                id,
                TimelineUpdate::status(TimelineStatus::Failed)
                    .with_error("boom")
                    .completed_at(done),
            )
            .unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.attempt, 1);
        assert_eq!(entry.status, TimelineStatus::Failed);
        assert_eq!(entry.error.as_deref(), Some("boom"));
        assert_eq!(entry.duration_ms, Some(1500));
    }

    #[test]
    fn test_update_rejects_backwards_status() {
        let (mut t, id) = timeline_with_first();
        t.update(id, TimelineUpdate::status(TimelineStatus::Running)).unwrap();
        t.update(id, TimelineUpdate::status(TimelineStatus::Success)).unwrap();
        assert!(matches!(
            t.update(id, TimelineUpdate::status(TimelineStatus::Running)),
            Err(DomainError::Conflict(_))
        ));
        // Enrichment after the fact is still allowed.
        assert!(t.update(id, TimelineUpdate::default().with_duration_ms(42)).is_ok());
        assert_eq!(t.entries()[0].duration_ms, Some(42));
    }

    #[test]
    fn test_update_unknown_entry_is_conflict() {
        let (mut t, _) = timeline_with_first();
        assert!(matches!(
            t.update(Uuid::new_v4(), TimelineUpdate::status(TimelineStatus::Running)),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let (t, _) = timeline_with_first();
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.is_array());
        let back: Timeline = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }
}
