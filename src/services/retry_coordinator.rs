//! Retry-or-fail decisions for failed attempts.
//!
//! The coordinator is the only place that increments `retry_count`. It
//! mutates the loaded project; the lifecycle manager persists it and
//! re-dispatches the worker when told to retry.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Project, ProjectStatus, RetryConfig, TimelineStatus};
use crate::domain::ports::ProjectRepository;
use crate::services::timeline_tracker::TimelineTracker;

/// Outcome of [`RetryCoordinator::on_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run `next_attempt` after `delay`
    Retry { next_attempt: u32, delay: Duration },
    /// Retries used up; the project is now terminally failed
    Exhausted,
}

/// Exponential delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately. Used by tests.
    pub fn immediate() -> Self {
        Self {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before the `retry_number`-th retry (1-based): doubles each time, capped.
    pub fn delay_for(&self, retry_number: u32) -> Duration {
        if retry_number == 0 || self.initial_backoff.is_zero() {
            return Duration::ZERO;
        }

        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build();

        let mut delay = self.initial_backoff;
        for _ in 0..retry_number {
            delay = backoff.next_backoff().unwrap_or(self.max_backoff);
        }
        delay.min(self.max_backoff)
    }
}

pub struct RetryCoordinator {
    policy: RetryPolicy,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Record the failure of `attempt` and decide what happens next.
    ///
    /// With retries left: bumps `retry_count`, opens a pending entry for the
    /// next attempt and leaves the project pending. Otherwise the project
    /// becomes terminally failed with `error` as its reason.
    pub fn on_failure<P: ProjectRepository>(
        &self,
        timeline: &TimelineTracker<P>,
        project: &mut Project,
        attempt: u32,
        error: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<RetryDecision> {
        if project.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: project.status.to_string(),
                to: ProjectStatus::Failed.to_string(),
                reason: "project already finished".to_string(),
            });
        }
        if attempt != project.current_attempt() {
            return Err(DomainError::Conflict(format!(
                "failure reported for attempt {attempt} but project {} is on attempt {}",
                project.id,
                project.current_attempt()
            )));
        }

        timeline.finish_attempt(project, attempt, TimelineStatus::Failed, Some(error), now)?;

        if project.can_retry() {
            project.retry_count += 1;
            let next_attempt = project.current_attempt();
            timeline.open_attempt(project, next_attempt, now)?;
            if project.status == ProjectStatus::Running {
                transition(project, ProjectStatus::Pending, now)?;
            }
            project.updated_at = now;

            return Ok(RetryDecision::Retry {
                next_attempt,
                delay: self.policy.delay_for(project.retry_count),
            });
        }

        transition(project, ProjectStatus::Failed, now)?;
        project.failure_reason = Some(error.to_string());
        Ok(RetryDecision::Exhausted)
    }
}

pub(crate) fn transition(project: &mut Project, to: ProjectStatus, now: DateTime<Utc>) -> DomainResult<()> {
    let from = project.status;
    project
        .transition_to(to, now)
        .map_err(|reason| DomainError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        })
}
