//! Read-side aggregation of bug records.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Bug, BugStatus, BugType};
use crate::domain::ports::{BugRepository, BugWrite};

/// Status counts for a set of bugs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BugCounts {
    pub total: u64,
    pub fixed: u64,
    pub failed: u64,
    pub pending: u64,
    /// Percentage of bugs fixed, 0 when there are none
    pub success_rate: f64,
}

/// Records worker-reported bugs and summarises them for display.
pub struct BugAggregator<B: BugRepository> {
    repo: Arc<B>,
}

impl<B: BugRepository> Clone for BugAggregator<B> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<B: BugRepository> BugAggregator<B> {
    pub fn new(repo: Arc<B>) -> Self {
        Self { repo }
    }

    /// Add a bug to its project's set. Redelivery of a known id is a no-op
    /// unless it moves a pending bug to a terminal status.
    pub async fn add(&self, bug: &Bug) -> DomainResult<BugWrite> {
        self.repo.record(bug).await
    }

    pub async fn bugs_for(&self, project_id: Uuid) -> DomainResult<Vec<Bug>> {
        self.repo.list_by_project(project_id).await
    }

    /// Bugs across all projects, by status.
    pub async fn status_totals(&self) -> DomainResult<HashMap<BugStatus, u64>> {
        self.repo.count_by_status().await
    }

    /// Bugs across all projects, by type.
    pub async fn type_totals(&self) -> DomainResult<HashMap<BugType, u64>> {
        self.repo.count_by_type().await
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn counts(bugs: &[Bug]) -> BugCounts {
        let mut counts = BugCounts::default();
        for bug in bugs {
            counts.total += 1;
            match bug.status {
                BugStatus::Fixed => counts.fixed += 1,
                BugStatus::Failed => counts.failed += 1,
                BugStatus::Pending => counts.pending += 1,
            }
        }
        if counts.total > 0 {
            counts.success_rate = counts.fixed as f64 / counts.total as f64 * 100.0;
        }
        counts
    }

    /// Fixed first, then pending, then failed. Stable within each group.
    pub fn sort_for_display(bugs: &mut [Bug]) {
        bugs.sort_by_key(|bug| bug.status.display_rank());
    }

    pub fn counts_by_type(bugs: &[Bug]) -> BTreeMap<BugType, u64> {
        let mut counts = BTreeMap::new();
        for bug in bugs {
            *counts.entry(bug.bug_type).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteBugRepository;

    type Aggregator = BugAggregator<SqliteBugRepository>;

    fn bug(status: BugStatus, file: &str) -> Bug {
        Bug::new(Uuid::nil(), file, BugType::Logic, 1, "x").with_status(status)
    }

    #[test]
    fn test_counts_and_success_rate() {
        let bugs = vec![
            bug(BugStatus::Fixed, "a"),
            bug(BugStatus::Fixed, "b"),
            bug(BugStatus::Failed, "c"),
            bug(BugStatus::Pending, "d"),
        ];
        let counts = Aggregator::counts(&bugs);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.fixed, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.pending, 1);
        assert!((counts.success_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_counts() {
        let counts = Aggregator::counts(&[]);
        assert_eq!(counts, BugCounts::default());
        assert!(counts.success_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_sort_for_display_is_stable() {
        let mut bugs = vec![
            bug(BugStatus::Failed, "f1"),
            bug(BugStatus::Pending, "p1"),
            bug(BugStatus::Fixed, "x1"),
            bug(BugStatus::Failed, "f2"),
            bug(BugStatus::Fixed, "x2"),
            bug(BugStatus::Pending, "p2"),
        ];
        Aggregator::sort_for_display(&mut bugs);
        let files: Vec<&str> = bugs.iter().map(|b| b.file_path.as_str()).collect();
        assert_eq!(files, vec!["x1", "x2", "p1", "p2", "f1", "f2"]);
    }

    #[test]
    fn test_counts_by_type() {
        let mut bugs = vec![bug(BugStatus::Fixed, "a"), bug(BugStatus::Fixed, "b")];
        bugs.push(Bug::new(Uuid::nil(), "c", BugType::Import, 2, "unused"));
        let by_type = Aggregator::counts_by_type(&bugs);
        assert_eq!(by_type.get(&BugType::Logic), Some(&2));
        assert_eq!(by_type.get(&BugType::Import), Some(&1));
    }
}
