//! Mock analysis worker for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Bug, CompletionReport, RunSummary, WorkerEvent, WorkerEventKind};
use crate::domain::ports::{AnalysisWorker, WorkerRequest};

/// What the mock does when an attempt starts.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Emit these events in order, then exit
    Script(Vec<WorkerEventKind>),
    /// Optionally report a start, then never finish
    Hang { started: bool },
    /// Fail to launch
    SpawnError(String),
}

impl MockBehavior {
    pub fn success(commit_count: u32, summary: RunSummary) -> Self {
        Self::success_with_bugs(commit_count, summary, Vec::new())
    }

    pub fn success_with_bugs(commit_count: u32, summary: RunSummary, bugs: Vec<Bug>) -> Self {
        let mut kinds = vec![WorkerEventKind::Started];
        kinds.extend(bugs.into_iter().map(|bug| WorkerEventKind::BugDetected { bug }));
        kinds.push(WorkerEventKind::Completed {
            report: CompletionReport {
                commit_count,
                summary,
            },
        });
        Self::Script(kinds)
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Script(vec![
            WorkerEventKind::Started,
            WorkerEventKind::Failed {
                error: error.into(),
            },
        ])
    }
}

/// Scripted worker. Behaviour can be overridden per attempt number.
#[derive(Clone)]
pub struct MockWorker {
    default: MockBehavior,
    per_attempt: Arc<RwLock<HashMap<u32, MockBehavior>>>,
    launches: Arc<RwLock<Vec<WorkerRequest>>>,
    running: Arc<AtomicUsize>,
    peak_running: Arc<AtomicUsize>,
    event_delay: Duration,
}

impl MockWorker {
    pub fn new(default: MockBehavior) -> Self {
        Self {
            default,
            per_attempt: Arc::new(RwLock::new(HashMap::new())),
            launches: Arc::new(RwLock::new(Vec::new())),
            running: Arc::new(AtomicUsize::new(0)),
            peak_running: Arc::new(AtomicUsize::new(0)),
            event_delay: Duration::ZERO,
        }
    }

    /// Pause between scripted events.
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    pub async fn set_attempt_behavior(&self, attempt: u32, behavior: MockBehavior) {
        self.per_attempt.write().await.insert(attempt, behavior);
    }

    /// Every request the mock was started with, in order.
    pub async fn launches(&self) -> Vec<WorkerRequest> {
        self.launches.read().await.clone()
    }

    /// Attempts currently inside `start`.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous attempts seen.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }

    async fn behavior_for(&self, attempt: u32) -> MockBehavior {
        self.per_attempt
            .read()
            .await
            .get(&attempt)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Decrements the running count when the attempt ends or is aborted.
struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnalysisWorker for MockWorker {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn start(
        &self,
        request: WorkerRequest,
        events: mpsc::Sender<WorkerEvent>,
    ) -> DomainResult<()> {
        self.launches.write().await.push(request.clone());
        let behavior = self.behavior_for(request.attempt).await;

        if let MockBehavior::SpawnError(message) = behavior {
            return Err(DomainError::WorkerError(message));
        }

        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(now_running, Ordering::SeqCst);
        let _guard = RunningGuard(self.running.clone());

        match behavior {
            MockBehavior::Script(kinds) => {
                // Scripts are written before the project exists, and one script
                // serves many launches: give each launch its own bug ids.
                let mut bug_ids: HashMap<Uuid, Uuid> = HashMap::new();
                for mut kind in kinds {
                    if let WorkerEventKind::BugDetected { bug } = &mut kind {
                        bug.project_id = request.project_id;
                        bug.id = *bug_ids.entry(bug.id).or_insert_with(Uuid::new_v4);
                    }
                    if !self.event_delay.is_zero() {
                        tokio::time::sleep(self.event_delay).await;
                    }
                    let event = WorkerEvent::new(request.project_id, request.attempt, kind);
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(())
            }
            MockBehavior::Hang { started } => {
                if started {
                    let _ = events
                        .send(WorkerEvent::started(request.project_id, request.attempt))
                        .await;
                }
                std::future::pending::<()>().await;
                Ok(())
            }
            MockBehavior::SpawnError(_) => Ok(()),
        }
    }
}
