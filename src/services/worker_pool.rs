//! Bounded dispatch of analysis attempts.
//!
//! Each attempt runs in its own supervising task. The supervisor waits out
//! the retry delay, takes a permit, runs the worker and forwards its events.
//! Anything that ends an attempt without a terminal event (launch failure,
//! exit without a result, silence past the event timeout) is reported as a
//! `Failed` event so the lifecycle manager sees a single kind of failure.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use uuid::Uuid;

use crate::domain::models::{WorkerConfig, WorkerEvent};
use crate::domain::ports::{AnalysisWorker, WorkerRequest};

/// Buffer between one worker and its supervisor.
const ATTEMPT_EVENT_BUFFER: usize = 64;

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Maximum attempts running at once.
    pub max_concurrent: usize,
    /// Silence after which a worker is treated as failed.
    pub event_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for WorkerPoolConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            event_timeout: Duration::from_secs(config.event_timeout_secs),
        }
    }
}

struct RunningAttempt {
    attempt: u32,
    handle: JoinHandle<()>,
}

type RunningMap = Arc<Mutex<HashMap<Uuid, RunningAttempt>>>;

pub struct WorkerPool {
    worker: Arc<dyn AnalysisWorker>,
    semaphore: Arc<Semaphore>,
    config: WorkerPoolConfig,
    running: RunningMap,
}

impl WorkerPool {
    pub fn new(worker: Arc<dyn AnalysisWorker>, config: WorkerPoolConfig) -> Self {
        Self {
            worker,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn worker_name(&self) -> &'static str {
        self.worker.name()
    }

    pub fn event_timeout(&self) -> Duration {
        self.config.event_timeout
    }

    /// Start an attempt in the background. Returns immediately.
    ///
    /// Any earlier attempt still tracked for the same project is aborted.
    pub async fn dispatch(
        &self,
        request: WorkerRequest,
        delay: Duration,
        sink: mpsc::Sender<WorkerEvent>,
    ) {
        let project_id = request.project_id;
        let attempt = request.attempt;

        // Held across spawn and insert so the task's own cleanup cannot run first.
        let mut running = self.running.lock().await;
        if let Some(previous) = running.remove(&project_id) {
            previous.handle.abort();
        }

        let worker = Arc::clone(&self.worker);
        let semaphore = Arc::clone(&self.semaphore);
        let timeout = self.config.event_timeout;
        let registry = Arc::clone(&self.running);

        let handle = tokio::spawn(async move {
            supervise(worker, semaphore, request, delay, timeout, sink).await;

            let mut running = registry.lock().await;
            if running.get(&project_id).is_some_and(|r| r.attempt == attempt) {
                running.remove(&project_id);
            }
        });

        running.insert(project_id, RunningAttempt { attempt, handle });
        tracing::debug!(
            %project_id,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "attempt dispatched"
        );
    }

    /// Abort the project's in-flight attempt, killing its worker.
    ///
    /// Returns whether an attempt was running.
    pub async fn cancel(&self, project_id: Uuid) -> bool {
        let Some(attempt) = self.running.lock().await.remove(&project_id) else {
            return false;
        };
        attempt.handle.abort();
        tracing::info!(%project_id, attempt = attempt.attempt, "attempt aborted");
        true
    }

    pub async fn is_running(&self, project_id: Uuid) -> bool {
        self.running.lock().await.contains_key(&project_id)
    }

    /// Projects with a tracked attempt.
    pub async fn tracked(&self) -> Vec<Uuid> {
        self.running.lock().await.keys().copied().collect()
    }

    /// Attempts dispatched and not yet finished, including ones waiting for a permit.
    pub async fn running_count(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Abort every tracked attempt.
    pub async fn shutdown(&self) {
        let mut running = self.running.lock().await;
        for (_, attempt) in running.drain() {
            attempt.handle.abort();
        }
    }
}

async fn supervise(
    worker: Arc<dyn AnalysisWorker>,
    semaphore: Arc<Semaphore>,
    request: WorkerRequest,
    delay: Duration,
    timeout: Duration,
    sink: mpsc::Sender<WorkerEvent>,
) {
    let project_id = request.project_id;
    let attempt = request.attempt;

    if !delay.is_zero() {
        sleep(delay).await;
    }
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return;
    };

    let (tx, mut rx) = mpsc::channel(ATTEMPT_EVENT_BUFFER);
    let run = worker.start(request, tx);
    tokio::pin!(run);
    let deadline = sleep(timeout);
    tokio::pin!(deadline);

    let mut run_result = None;
    let mut reported_terminal = false;

    loop {
        tokio::select! {
            result = &mut run, if run_result.is_none() => {
                run_result = Some(result);
            }
            received = rx.recv() => {
                let Some(event) = received else { break };
                reported_terminal |= event.is_terminal();
                deadline.as_mut().reset(Instant::now() + timeout);
                if sink.send(event).await.is_err() {
                    return;
                }
            }
            () = &mut deadline => {
                if !reported_terminal {
                    tracing::warn!(
                        %project_id,
                        attempt,
                        timeout_secs = timeout.as_secs(),
                        "worker unresponsive, failing attempt"
                    );
                    let error = format!("worker unresponsive: no event within {}s", timeout.as_secs());
                    let _ = sink.send(WorkerEvent::failed(project_id, attempt, error)).await;
                }
                return;
            }
        }
    }

    // Channel closed: the worker dropped its sender, normally by finishing.
    let run_result = match run_result {
        Some(result) => result,
        None => tokio::select! {
            result = &mut run => result,
            () = &mut deadline => Ok(()),
        },
    };

    if reported_terminal {
        return;
    }

    let error = match run_result {
        Err(e) => {
            tracing::warn!(%project_id, attempt, error = %e, "worker dispatch failed");
            format!("dispatch failed: {e}")
        }
        Ok(()) => {
            tracing::warn!(%project_id, attempt, "worker exited without reporting a result");
            "worker exited without reporting a result".to_string()
        }
    };
    let _ = sink.send(WorkerEvent::failed(project_id, attempt, error)).await;
}
