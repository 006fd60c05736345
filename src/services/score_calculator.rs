//! Run scoring.
//!
//! Scores are a base value plus three non-negative bonuses, so a completed
//! run never scores below its base.

use std::sync::Arc;

use crate::domain::models::Project;

/// Metrics a score is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreInput {
    pub base: u32,
    /// Seconds from submission to completion; 0 or less when unknown
    pub elapsed_secs: i64,
    pub commit_count: u32,
    pub total_errors: u32,
    pub fixed_errors: u32,
}

impl ScoreInput {
    /// Metrics of a completed project.
    pub fn from_project(project: &Project, base: u32) -> Self {
        let summary = project.summary.unwrap_or_default();
        Self {
            base,
            elapsed_secs: project.elapsed_secs(),
            commit_count: project.commit_count,
            total_errors: summary.total_errors,
            fixed_errors: summary.clamped_fixed_errors(),
        }
    }
}

/// A scoring rule. Must be pure and total.
pub trait ScoringPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, input: &ScoreInput) -> u32;
}

/// Base plus speed, commit and quality bonuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct BonusScoring;

impl ScoringPolicy for BonusScoring {
    fn name(&self) -> &'static str {
        "bonus"
    }

    fn score(&self, input: &ScoreInput) -> u32 {
        score(
            input.base,
            input.elapsed_secs,
            input.commit_count,
            input.total_errors,
            input.fixed_errors,
        )
    }
}

/// 15 under three minutes, 10 under five, 5 under ten, otherwise 0.
pub fn speed_bonus(elapsed_secs: i64) -> u32 {
    match elapsed_secs {
        t if t <= 0 => 0,
        t if t < 180 => 15,
        t if t < 300 => 10,
        t if t < 600 => 5,
        _ => 0,
    }
}

pub fn commit_bonus(commit_count: u32) -> u32 {
    30u32.saturating_sub(commit_count)
}

/// Share of fixed errors scaled to 20, rounded half away from zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quality_bonus(total_errors: u32, fixed_errors: u32) -> u32 {
    if total_errors == 0 {
        return 0;
    }
    let ratio = f64::from(fixed_errors.min(total_errors)) / f64::from(total_errors);
    (ratio * 20.0).round() as u32
}

pub fn score(base: u32, elapsed_secs: i64, commit_count: u32, total_errors: u32, fixed_errors: u32) -> u32 {
    base.saturating_add(speed_bonus(elapsed_secs))
        .saturating_add(commit_bonus(commit_count))
        .saturating_add(quality_bonus(total_errors, fixed_errors))
}

/// Applies the configured [`ScoringPolicy`] to completed projects.
#[derive(Clone)]
pub struct ScoreCalculator {
    policy: Arc<dyn ScoringPolicy>,
    base_score: u32,
}

impl ScoreCalculator {
    pub fn new(policy: Arc<dyn ScoringPolicy>, base_score: u32) -> Self {
        Self { policy, base_score }
    }

    pub fn with_base_score(base_score: u32) -> Self {
        Self::new(Arc::new(BonusScoring), base_score)
    }

    pub fn base_score(&self) -> u32 {
        self.base_score
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn score_project(&self, project: &Project) -> u32 {
        self.policy
            .score(&ScoreInput::from_project(project, self.base_score))
    }
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::with_base_score(100)
    }
}
