//! Project lifecycle orchestration.
//!
//! [`ProjectLifecycleManager`] owns the path from submission to a terminal
//! state: it persists new projects, dispatches attempts to the worker pool
//! and applies every worker event under a per-project lock. Events are
//! idempotent; duplicates, stale attempts and events for finished projects
//! are discarded without touching persisted state.
//!
//! A terminal event that cannot be written because storage is briefly
//! unavailable is redelivered with backoff. Managers that run workers also
//! run a recovery loop that keeps their own projects fresh and fails the
//! open attempt of projects left behind by an orchestrator that died.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    validate_name, validate_repo_url, BatchFailure, BatchRequest, BatchSubmission, Bug, Config, EventKey,
    Project, ProjectStatus, TimelineEntry, TimelineStatus, WorkerEvent, WorkerEventKind,
};
use crate::domain::ports::{AnalysisWorker, BugRepository, ProjectFilter, ProjectRepository, WorkerRequest};
use crate::services::branch_name::BranchNameGenerator;
use crate::services::bug_aggregator::BugAggregator;
use crate::services::retry_coordinator::{transition, RetryCoordinator, RetryDecision, RetryPolicy};
use crate::services::score_calculator::{ScoreCalculator, ScoringPolicy};
use crate::services::timeline_tracker::TimelineTracker;
use crate::services::worker_pool::{WorkerPool, WorkerPoolConfig};

/// Failure reason recorded when a user cancels a run.
pub const CANCELLED_REASON: &str = "cancelled by user";

/// Prefix of the attempt error recorded by the recovery sweep.
pub const ORCHESTRATOR_LOST_REASON: &str = "orchestrator lost";

/// Event timeouts without a write before an unfinished project counts as abandoned.
pub const STALE_AFTER_TIMEOUTS: u32 = 3;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Attempts at re-applying a terminal event after a transient storage error.
const REDELIVERY_LIMIT: u32 = 8;

const REDELIVERY_BACKOFF: RetryPolicy = RetryPolicy {
    initial_backoff: Duration::from_millis(100),
    max_backoff: Duration::from_secs(5),
};

const MIN_RECOVERY_INTERVAL: Duration = Duration::from_millis(10);

/// Tunables for [`ProjectLifecycleManager`].
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Retry budget for projects submitted without one.
    pub default_max_retries: u32,
    pub retry_policy: RetryPolicy,
    pub base_score: u32,
    pub pool: WorkerPoolConfig,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ManagerSettings {
    fn from(config: &Config) -> Self {
        Self {
            default_max_retries: config.retry.max_retries,
            retry_policy: RetryPolicy::from(&config.retry),
            base_score: config.scoring.base_score,
            pool: WorkerPoolConfig::from(&config.worker),
        }
    }
}

/// Why an event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Already applied.
    Duplicate,
    UnknownProject,
    /// Project reached a terminal state.
    ProjectFinished,
    /// Attempt was superseded by a retry.
    StaleAttempt,
    /// Attempt has not been opened yet.
    FutureAttempt,
    /// Bug belongs to a different project than the event.
    ForeignBug,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::UnknownProject => "unknown_project",
            Self::ProjectFinished => "project_finished",
            Self::StaleAttempt => "stale_attempt",
            Self::FutureAttempt => "future_attempt",
            Self::ForeignBug => "foreign_bug",
        }
    }
}

/// Result of handing one event to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Discarded(DiscardReason),
}

/// Aggregate counters across all projects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestratorStats {
    pub total_projects: u64,
    pub projects_by_status: BTreeMap<String, u64>,
    pub total_bugs: u64,
    pub bugs_by_status: BTreeMap<String, u64>,
    pub bugs_by_type: BTreeMap<String, u64>,
    /// Attempts dispatched by this process and not yet finished.
    pub active_attempts: usize,
}

/// Drives projects through their lifecycle.
pub struct ProjectLifecycleManager<P, B>
where
    P: ProjectRepository + 'static,
    B: BugRepository + 'static,
{
    projects: Arc<P>,
    bugs: BugAggregator<B>,
    timeline: TimelineTracker<P>,
    retry: RetryCoordinator,
    scorer: ScoreCalculator,
    pool: WorkerPool,
    default_max_retries: u32,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    seen: Mutex<HashSet<EventKey>>,
    events_tx: mpsc::Sender<WorkerEvent>,
    event_loop: OnceLock<JoinHandle<()>>,
    recovery_loop: OnceLock<JoinHandle<()>>,
}

impl<P, B> ProjectLifecycleManager<P, B>
where
    P: ProjectRepository + 'static,
    B: BugRepository + 'static,
{
    /// Build a manager without starting its event loop.
    ///
    /// The returned receiver carries worker events; pass it to [`Self::spawn_event_loop`].
    pub fn new(
        projects: Arc<P>,
        bugs: Arc<B>,
        worker: Arc<dyn AnalysisWorker>,
        settings: ManagerSettings,
    ) -> (Self, mpsc::Receiver<WorkerEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let manager = Self {
            timeline: TimelineTracker::new(Arc::clone(&projects)),
            projects,
            bugs: BugAggregator::new(bugs),
            retry: RetryCoordinator::new(settings.retry_policy),
            scorer: ScoreCalculator::with_base_score(settings.base_score),
            pool: WorkerPool::new(worker, settings.pool),
            default_max_retries: settings.default_max_retries,
            locks: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashSet::new()),
            events_tx,
            event_loop: OnceLock::new(),
            recovery_loop: OnceLock::new(),
        };
        (manager, events_rx)
    }

    /// Replace the scoring policy, keeping the configured base.
    pub fn with_scoring(mut self, policy: Arc<dyn ScoringPolicy>) -> Self {
        self.scorer = ScoreCalculator::new(policy, self.scorer.base_score());
        self
    }

    /// Start consuming worker events.
    pub fn spawn_event_loop(self, events: mpsc::Receiver<WorkerEvent>) -> Arc<Self> {
        let manager = Arc::new(self);
        let handle = tokio::spawn(Self::consume_events(Arc::clone(&manager), events));
        // Freshly built, so the slot is empty.
        let _ = manager.event_loop.set(handle);
        manager
    }

    /// Build a manager and start its event loop.
    pub fn start(
        projects: Arc<P>,
        bugs: Arc<B>,
        worker: Arc<dyn AnalysisWorker>,
        settings: ManagerSettings,
    ) -> Arc<Self> {
        let (manager, events) = Self::new(projects, bugs, worker, settings);
        manager.spawn_event_loop(events)
    }

    async fn consume_events(manager: Arc<Self>, mut events: mpsc::Receiver<WorkerEvent>) {
        // Redeliveries so far, per terminal event that failed to apply.
        let mut redeliveries: HashMap<EventKey, u32> = HashMap::new();

        while let Some(event) = events.recv().await {
            let key = event.key();
            let project_id = event.project_id;
            let attempt = event.attempt;
            let kind = event.kind.as_str();
            match manager.handle_worker_event(event.clone()).await {
                Ok(EventOutcome::Applied) => {
                    redeliveries.remove(&key);
                }
                Ok(EventOutcome::Discarded(reason)) => {
                    redeliveries.remove(&key);
                    tracing::debug!(%project_id, attempt, kind, reason = reason.as_str(), "event discarded");
                }
                Err(e) if event.is_terminal() => {
                    let tries = redeliveries.entry(key).or_insert(0);
                    *tries += 1;
                    let tries = *tries;
                    if e.is_transient() && tries <= REDELIVERY_LIMIT {
                        let delay = REDELIVERY_BACKOFF.delay_for(tries);
                        tracing::warn!(
                            %project_id,
                            attempt,
                            kind,
                            tries,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "terminal event not applied, redelivering"
                        );
                        manager.redeliver(event, delay);
                        continue;
                    }

                    redeliveries.remove(&key);
                    if matches!(event.kind, WorkerEventKind::Completed { .. }) {
                        // The result cannot be stored; fail the attempt so the project still moves on.
                        tracing::error!(%project_id, attempt, error = %e, "completion could not be recorded, failing attempt");
                        let failed = WorkerEvent::failed(project_id, attempt, format!("could not record result: {e}"));
                        manager.redeliver(failed, Duration::ZERO);
                    } else {
                        tracing::error!(
                            %project_id,
                            attempt,
                            kind,
                            error = %e,
                            "terminal event dropped, project left to the recovery sweep"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(%project_id, attempt, kind, error = %e, "failed to apply worker event");
                }
            }
        }
        tracing::debug!("worker event channel closed");
    }

    /// Queue `event` for the event loop again after `delay`.
    fn redeliver(&self, event: WorkerEvent, delay: Duration) {
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Closed only when the manager is gone.
            let _ = events_tx.send(event).await;
        });
    }

    /// Start the recovery loop. Only managers that run workers should call this.
    ///
    /// Every event timeout the loop moves `updated_at` forward on the
    /// projects this manager is running, then hands projects nobody has
    /// written for [`STALE_AFTER_TIMEOUTS`] timeouts to [`Self::recover_stale`].
    /// The first pass runs immediately.
    pub fn spawn_recovery_loop(self: &Arc<Self>) {
        let every = self.pool.event_timeout().max(MIN_RECOVERY_INTERVAL);
        let handle = tokio::spawn(Self::recover_periodically(Arc::clone(self), every));
        if let Err(duplicate) = self.recovery_loop.set(handle) {
            duplicate.abort();
        }
    }

    async fn recover_periodically(manager: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            manager.heartbeat().await;
            match manager.recover_stale().await {
                Ok(recovered) if !recovered.is_empty() => {
                    tracing::info!(count = recovered.len(), "recovered abandoned projects");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "recovery sweep failed"),
            }
        }
    }

    /// Mark every project with a tracked attempt as alive.
    async fn heartbeat(&self) {
        let now = Utc::now();
        for project_id in self.pool.tracked().await {
            if let Err(e) = self.projects.touch(project_id, now).await {
                tracing::warn!(%project_id, error = %e, "failed to refresh project");
            }
        }
    }

    /// Age after which an unfinished project nobody writes to is abandoned.
    pub fn stale_after(&self) -> Duration {
        self.pool.event_timeout().saturating_mul(STALE_AFTER_TIMEOUTS)
    }

    /// Fail the open attempt of every abandoned project.
    ///
    /// A project is abandoned when it is unfinished, has not been written for
    /// [`Self::stale_after`] and has no attempt tracked by this manager. The
    /// failure goes through the normal retry path, so the next attempt runs
    /// here. Returns the recovered project ids.
    pub async fn recover_stale(&self) -> DomainResult<Vec<Uuid>> {
        let Some(cutoff) = chrono::Duration::from_std(self.stale_after())
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            return Ok(Vec::new());
        };

        let mut recovered = Vec::new();
        for candidate in self.projects.list_stale(cutoff).await? {
            if self.pool.is_running(candidate.id).await {
                continue;
            }
            match self.fail_abandoned(candidate.id, cutoff).await {
                Ok(true) => recovered.push(candidate.id),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(project_id = %candidate.id, error = %e, "could not recover abandoned project");
                }
            }
        }
        Ok(recovered)
    }

    async fn fail_abandoned(&self, project_id: Uuid, cutoff: DateTime<Utc>) -> DomainResult<bool> {
        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: an event may have landed since the scan.
        let Some(mut project) = self.projects.get(project_id).await? else {
            self.forget(project_id).await;
            return Ok(false);
        };
        if project.is_terminal() {
            self.forget(project_id).await;
            return Ok(false);
        }
        if project.updated_at >= cutoff || self.pool.is_running(project_id).await {
            return Ok(false);
        }

        let attempt = project.current_attempt();
        let error = format!(
            "{ORCHESTRATOR_LOST_REASON}: no progress since {}",
            project.updated_at.to_rfc3339()
        );
        let decision = self
            .retry
            .on_failure(&self.timeline, &mut project, attempt, &error, Utc::now())?;
        self.save(&mut project).await?;
        tracing::warn!(%project_id, attempt, ?decision, "recovered abandoned project");

        match decision {
            RetryDecision::Retry { next_attempt, delay } => {
                self.dispatch(&project, next_attempt, delay).await;
            }
            RetryDecision::Exhausted => self.forget(project_id).await,
        }
        Ok(true)
    }

    /// Stop the event and recovery loops and abort in-flight attempts.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.event_loop.get() {
            handle.abort();
        }
        if let Some(handle) = self.recovery_loop.get() {
            handle.abort();
        }
        self.pool.shutdown().await;
    }

    /// Validate and persist a new project, then dispatch its first attempt.
    ///
    /// Nothing is stored when validation fails.
    pub async fn create_project(
        &self,
        repo_url: &str,
        team_name: &str,
        leader_name: &str,
        max_retries: Option<u32>,
    ) -> DomainResult<Project> {
        let repo_url = validate_repo_url(repo_url)?;
        let team_name = validate_name("team_name", team_name)?;
        let leader_name = validate_name("leader_name", leader_name)?;
        let branch_name = BranchNameGenerator::generate(&team_name, &leader_name)?;
        let max_retries = max_retries.unwrap_or(self.default_max_retries);

        let project = Project::new(repo_url, team_name, leader_name, branch_name, max_retries);
        project.validate().map_err(DomainError::Conflict)?;
        self.projects.create(&project).await?;

        tracing::info!(
            project_id = %project.id,
            repo_url = %project.repo_url,
            branch = %project.branch_name,
            max_retries,
            "project submitted"
        );

        self.dispatch(&project, 1, Duration::ZERO).await;
        Ok(project)
    }

    /// Submit each request in order, as [`Self::create_project`] would.
    ///
    /// A rejected request is recorded with its index. Unless the batch sets
    /// `continue_on_error`, the requests after it are skipped.
    pub async fn submit_batch(&self, batch: &BatchRequest) -> DomainResult<BatchSubmission> {
        batch.validate()?;

        let mut submission = BatchSubmission::default();
        for (index, request) in batch.requests.iter().enumerate() {
            let created = self
                .create_project(
                    &request.repo_url,
                    &request.team_name,
                    &request.leader_name,
                    request.max_retries,
                )
                .await;
            match created {
                Ok(project) => submission.project_ids.push(project.id),
                Err(e) => {
                    tracing::warn!(index, error = %e, "batch request rejected");
                    submission.failed.push(BatchFailure {
                        index,
                        error: e.to_string(),
                    });
                    if !batch.continue_on_error {
                        submission.skipped = batch.requests.len() - index - 1;
                        break;
                    }
                }
            }
        }

        tracing::info!(
            submitted = submission.count(),
            rejected = submission.failed.len(),
            skipped = submission.skipped,
            "batch submitted"
        );
        Ok(submission)
    }

    /// Apply one worker event.
    pub async fn handle_worker_event(&self, event: WorkerEvent) -> DomainResult<EventOutcome> {
        let project_id = event.project_id;
        let attempt = event.attempt;
        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;

        let key = event.key();
        if self.seen.lock().await.contains(&key) {
            return Ok(EventOutcome::Discarded(DiscardReason::Duplicate));
        }

        let Some(mut project) = self.projects.get(project_id).await? else {
            self.forget(project_id).await;
            return Ok(EventOutcome::Discarded(DiscardReason::UnknownProject));
        };

        if project.is_terminal() {
            // Finished elsewhere, for example cancelled by another process.
            if self.pool.cancel(project_id).await {
                tracing::info!(%project_id, status = %project.status, "stopped worker of finished project");
            }
            self.forget(project_id).await;
            return Ok(EventOutcome::Discarded(DiscardReason::ProjectFinished));
        }

        let current = project.current_attempt();
        if attempt < current {
            return Ok(EventOutcome::Discarded(DiscardReason::StaleAttempt));
        }
        if attempt > current {
            return Ok(EventOutcome::Discarded(DiscardReason::FutureAttempt));
        }

        let now = Utc::now();
        let mut retry_after = None;

        match event.kind {
            WorkerEventKind::Started => {
                if project.status == ProjectStatus::Pending {
                    self.mark_running(&mut project, attempt)?;
                    tracing::info!(%project_id, attempt, "attempt started");
                }
            }
            WorkerEventKind::BugDetected { bug } => {
                return self.record_bug(&bug, project_id, attempt, key).await;
            }
            WorkerEventKind::Completed { report } => {
                if project.status == ProjectStatus::Pending {
                    self.mark_running(&mut project, attempt)?;
                }
                self.timeline
                    .finish_attempt(&mut project, attempt, TimelineStatus::Success, None, now)?;
                project.commit_count = report.commit_count;
                project.summary = Some(report.summary);
                transition(&mut project, ProjectStatus::Completed, now)?;
                let score = self.scorer.score_project(&project);
                project.score = Some(score);
                tracing::info!(
                    %project_id,
                    attempt,
                    score,
                    commit_count = project.commit_count,
                    elapsed_secs = project.elapsed_secs(),
                    "project completed"
                );
            }
            WorkerEventKind::Failed { error } => {
                match self
                    .retry
                    .on_failure(&self.timeline, &mut project, attempt, &error, now)?
                {
                    RetryDecision::Retry {
                        next_attempt,
                        delay,
                    } => {
                        tracing::warn!(
                            %project_id,
                            attempt,
                            next_attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            error = %error,
                            "attempt failed, retrying"
                        );
                        retry_after = Some((next_attempt, delay));
                    }
                    RetryDecision::Exhausted => {
                        tracing::error!(
                            %project_id,
                            attempt,
                            retry_count = project.retry_count,
                            error = %error,
                            "project failed, retries exhausted"
                        );
                    }
                }
            }
        }

        self.save(&mut project).await?;
        self.seen.lock().await.insert(key);

        if let Some((next_attempt, delay)) = retry_after {
            self.dispatch(&project, next_attempt, delay).await;
        }
        if project.is_terminal() {
            self.forget(project_id).await;
        }
        Ok(EventOutcome::Applied)
    }

    /// Cancel a project that has not finished.
    ///
    /// Kills the in-flight worker, closes the open attempt and marks the
    /// project failed.
    pub async fn cancel_project(&self, project_id: Uuid) -> DomainResult<Project> {
        let lock = self.project_lock(project_id).await;
        let _guard = lock.lock().await;

        let mut project = self
            .projects
            .get(project_id)
            .await?
            .ok_or(DomainError::ProjectNotFound(project_id))?;

        if project.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: project.status.to_string(),
                to: ProjectStatus::Failed.to_string(),
                reason: "project already finished".to_string(),
            });
        }

        let aborted = self.pool.cancel(project_id).await;
        let now = Utc::now();
        let attempt = project.current_attempt();
        let open = project
            .timeline
            .entry_for_attempt(attempt)
            .is_some_and(|entry| !entry.status.is_terminal());
        if open {
            self.timeline.finish_attempt(
                &mut project,
                attempt,
                TimelineStatus::Failed,
                Some(CANCELLED_REASON),
                now,
            )?;
        }
        transition(&mut project, ProjectStatus::Failed, now)?;
        project.failure_reason = Some(CANCELLED_REASON.to_string());

        self.save(&mut project).await?;
        self.forget(project_id).await;

        tracing::info!(%project_id, attempt, aborted_worker = aborted, "project cancelled");
        Ok(project)
    }

    pub async fn get_project(&self, project_id: Uuid) -> DomainResult<Project> {
        self.projects
            .get(project_id)
            .await?
            .ok_or(DomainError::ProjectNotFound(project_id))
    }

    /// Projects matching `filter`, oldest first.
    pub async fn list_projects(&self, filter: ProjectFilter) -> DomainResult<Vec<Project>> {
        self.projects.list(filter).await
    }

    /// Bugs of a project in display order.
    pub async fn get_bugs(&self, project_id: Uuid) -> DomainResult<Vec<Bug>> {
        self.get_project(project_id).await?;
        let mut bugs = self.bugs.bugs_for(project_id).await?;
        BugAggregator::<B>::sort_for_display(&mut bugs);
        Ok(bugs)
    }

    pub async fn get_timeline(&self, project_id: Uuid) -> DomainResult<Vec<TimelineEntry>> {
        self.timeline.get_timeline(project_id).await
    }

    pub async fn stats(&self) -> DomainResult<OrchestratorStats> {
        let projects_by_status: BTreeMap<String, u64> = self
            .projects
            .count_by_status()
            .await?
            .into_iter()
            .map(|(status, n)| (status.as_str().to_string(), n))
            .collect();
        let bugs_by_status: BTreeMap<String, u64> = self
            .bugs
            .status_totals()
            .await?
            .into_iter()
            .map(|(status, n)| (status.as_str().to_string(), n))
            .collect();
        let bugs_by_type: BTreeMap<String, u64> = self
            .bugs
            .type_totals()
            .await?
            .into_iter()
            .map(|(bug_type, n)| (bug_type.as_str().to_string(), n))
            .collect();

        Ok(OrchestratorStats {
            total_projects: projects_by_status.values().sum(),
            total_bugs: bugs_by_status.values().sum(),
            projects_by_status,
            bugs_by_status,
            bugs_by_type,
            active_attempts: self.pool.running_count().await,
        })
    }

    pub fn worker_name(&self) -> &'static str {
        self.pool.worker_name()
    }

    async fn record_bug(
        &self,
        bug: &Bug,
        project_id: Uuid,
        attempt: u32,
        key: EventKey,
    ) -> DomainResult<EventOutcome> {
        if bug.project_id != project_id {
            tracing::warn!(
                %project_id,
                bug_project_id = %bug.project_id,
                bug_id = %bug.id,
                "bug reported for another project"
            );
            return Ok(EventOutcome::Discarded(DiscardReason::ForeignBug));
        }

        let write = self.bugs.add(bug).await?;
        self.seen.lock().await.insert(key);
        tracing::debug!(
            %project_id,
            attempt,
            bug_id = %bug.id,
            bug_type = bug.bug_type.as_str(),
            file = %bug.file_path,
            result = ?write,
            "bug recorded"
        );
        Ok(EventOutcome::Applied)
    }

    fn mark_running(&self, project: &mut Project, attempt: u32) -> DomainResult<()> {
        let now = Utc::now();
        self.timeline.start_attempt(project, attempt, now)?;
        transition(project, ProjectStatus::Running, now)
    }

    async fn save(&self, project: &mut Project) -> DomainResult<()> {
        project.validate().map_err(DomainError::Conflict)?;
        project.version = self.projects.update(project).await?;
        Ok(())
    }

    async fn dispatch(&self, project: &Project, attempt: u32, delay: Duration) {
        let request = WorkerRequest::for_attempt(project, attempt);
        self.pool
            .dispatch(request, delay, self.events_tx.clone())
            .await;
    }

    async fn project_lock(&self, project_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(project_id).or_default())
    }

    async fn forget(&self, project_id: Uuid) {
        self.seen
            .lock()
            .await
            .retain(|key| key.project_id != project_id);
        self.locks.lock().await.remove(&project_id);
    }
}
