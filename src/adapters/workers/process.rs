//! Analysis worker backed by an external process.
//!
//! The process receives the attempt on its command line and reports progress
//! as JSON lines on stdout, one object per line:
//!
//! ```text
//! {"type":"started"}
//! {"type":"bug_detected","id":"…","file_path":"app.py","bug_type":"SYNTAX","line_number":3,"error_message":"…","fix_applied":"…"}
//! {"type":"completed","commit_count":2,"summary":{"total_files":10,"total_errors":4,"fixed_errors":3}}
//! {"type":"failed","error":"clone failed"}
//! ```
//!
//! Other stdout lines are ignored. The terminal message is held until the
//! process exits; a non-zero exit always reports a failure.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Bug, BugStatus, BugType, RunSummary, WorkerConfig, WorkerEvent, WorkerEventKind,
};
use crate::domain::ports::{AnalysisWorker, WorkerRequest};

/// Lines of stderr kept for failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// Configuration for launching the worker process.
#[derive(Debug, Clone)]
pub struct ProcessWorkerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub env_vars: HashMap<String, String>,
}

impl Default for ProcessWorkerConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for ProcessWorkerConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
            env_vars: HashMap::new(),
        }
    }
}

/// Runs each attempt as a child process.
pub struct ProcessWorker {
    config: ProcessWorkerConfig,
}

impl ProcessWorker {
    pub fn new(config: ProcessWorkerConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, request: &WorkerRequest) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .arg(request.project_id.to_string())
            .arg(&request.repo_url)
            .arg(&request.team_name)
            .arg(&request.leader_name)
            .arg(&request.branch_name)
            .arg(request.attempt.to_string())
            .arg(request.max_retries.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.config.env_vars {
            cmd.env(key, value);
        }

        cmd.env("REPOSCORE_PROJECT_ID", request.project_id.to_string())
            .env("REPOSCORE_ATTEMPT", request.attempt.to_string())
            .env("MAX_RETRIES", request.max_retries.to_string());
        cmd
    }
}

#[async_trait]
impl AnalysisWorker for ProcessWorker {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn start(
        &self,
        request: WorkerRequest,
        events: mpsc::Sender<WorkerEvent>,
    ) -> DomainResult<()> {
        let mut child = self.build_command(&request).spawn().map_err(|e| {
            DomainError::WorkerError(format!("failed to spawn {}: {e}", self.config.command))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::WorkerError("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::WorkerError("failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        });

        let mut terminal: Option<WorkerEvent> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| DomainError::WorkerError(format!("failed to read worker output: {e}")))?
        {
            let Some(message) = parse_message(&line) else {
                tracing::trace!(project_id = %request.project_id, line = %line, "worker output");
                continue;
            };
            let event = message.into_event(&request);
            if event.is_terminal() {
                terminal.get_or_insert(event);
            } else if events.send(event).await.is_err() {
                // Nobody is listening for this attempt any more.
                return Ok(());
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DomainError::WorkerError(format!("failed to wait for worker: {e}")))?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        let outcome = if status.success() {
            terminal
        } else {
            let reason = match terminal {
                Some(WorkerEvent {
                    kind: WorkerEventKind::Failed { error },
                    ..
                }) => error,
                _ if stderr_tail.is_empty() => format!("worker exited with {status}"),
                _ => format!("worker exited with {status}: {stderr_tail}"),
            };
            Some(WorkerEvent::failed(request.project_id, request.attempt, reason))
        };

        if let Some(event) = outcome {
            let _ = events.send(event).await;
        }
        Ok(())
    }
}

/// One line of the worker's stdout protocol.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WorkerMessage {
    Started,
    BugDetected {
        #[serde(default)]
        id: Option<Uuid>,
        file_path: String,
        bug_type: BugType,
        #[serde(default)]
        line_number: u32,
        error_message: String,
        #[serde(default)]
        fix_applied: Option<String>,
        #[serde(default)]
        status: Option<BugStatus>,
    },
    Completed {
        #[serde(default)]
        commit_count: u32,
        summary: RunSummary,
    },
    Failed {
        error: String,
    },
}

fn parse_message(line: &str) -> Option<WorkerMessage> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    serde_json::from_str(line).ok()
}

impl WorkerMessage {
    fn into_event(self, request: &WorkerRequest) -> WorkerEvent {
        let (project_id, attempt) = (request.project_id, request.attempt);
        match self {
            Self::Started => WorkerEvent::started(project_id, attempt),
            Self::BugDetected {
                id,
                file_path,
                bug_type,
                line_number,
                error_message,
                fix_applied,
                status,
            } => {
                let status = status.unwrap_or(if fix_applied.is_some() {
                    BugStatus::Fixed
                } else {
                    BugStatus::Pending
                });
                let mut bug = Bug::new(project_id, file_path, bug_type, line_number, error_message)
                    .with_status(status);
                bug.fix_applied = fix_applied;
                if let Some(id) = id {
                    bug = bug.with_id(id);
                }
                WorkerEvent::bug_detected(project_id, attempt, bug)
            }
            Self::Completed {
                commit_count,
                summary,
            } => WorkerEvent::completed(project_id, attempt, commit_count, summary),
            Self::Failed { error } => WorkerEvent::failed(project_id, attempt, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> WorkerRequest {
        WorkerRequest {
            project_id: Uuid::new_v4(),
            repo_url: "https://github.com/acme/widgets".to_string(),
            team_name: "Acme".to_string(),
            leader_name: "Jo".to_string(),
            branch_name: "ACME_JO_AI_Fix".to_string(),
            attempt: 2,
            max_retries: 5,
        }
    }

    fn shell_worker(script: &str) -> ProcessWorker {
        ProcessWorker::new(ProcessWorkerConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string(), "worker".to_string()],
            working_dir: None,
            env_vars: HashMap::new(),
        })
    }

    async fn collect(worker: &ProcessWorker, request: WorkerRequest) -> (DomainResult<()>, Vec<WorkerEvent>) {
        let (tx, mut rx) = mpsc::channel(32);
        let result = worker.start(request, tx).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    #[test]
    fn test_parse_bug_message() {
        let req = request();
        let msg = parse_message(
            r#"{"type":"bug_detected","file_path":"a.py","bug_type":"LINTING","line_number":4,"error_message":"E501","fix_applied":"wrapped line"}"#,
        )
        .unwrap();
        let event = msg.into_event(&req);
        match event.kind {
            WorkerEventKind::BugDetected { bug } => {
                assert_eq!(bug.project_id, req.project_id);
                assert_eq!(bug.bug_type, BugType::Linting);
                assert_eq!(bug.status, BugStatus::Fixed);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(event.attempt, 2);
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert!(parse_message("Cloning into 'repo'...").is_none());
        assert!(parse_message(r#"{"type":"unknown"}"#).is_none());
        assert!(matches!(
            parse_message(r#" {"type":"started"} "#),
            Some(WorkerMessage::Started)
        ));
    }

    #[tokio::test]
    async fn test_successful_run_reports_events_in_order() {
        let worker = shell_worker(
            r#"echo '{"type":"started"}'
echo 'working on it'
echo '{"type":"completed","commit_count":3,"summary":{"totalFiles":5,"totalErrors":2,"fixedErrors":2}}'"#,
        );
        let req = request();
        let (result, events) = collect(&worker, req.clone()).await;
        result.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], WorkerEvent::started(req.project_id, 2));
        assert_eq!(
            events[1],
            WorkerEvent::completed(req.project_id, 2, 3, RunSummary::new(5, 2, 2))
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_overrides_completion() {
        let worker = shell_worker(
            r#"echo '{"type":"completed","commit_count":1,"summary":{"total_files":1,"total_errors":0,"fixed_errors":0}}'
echo 'disk full' >&2
exit 3"#,
        );
        let (result, events) = collect(&worker, request()).await;
        result.unwrap();

        let last = events.last().unwrap();
        match &last.kind {
            WorkerEventKind::Failed { error } => assert!(error.contains("disk full"), "{error}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_attempt_arguments_and_environment() {
        let worker = shell_worker(
            r#"if [ "$6" = "2" ] && [ "$MAX_RETRIES" = "5" ] && [ "$REPOSCORE_ATTEMPT" = "2" ]; then
  echo '{"type":"started"}'
else
  echo '{"type":"failed","error":"bad arguments"}'
fi"#,
        );
        let req = request();
        let (_, events) = collect(&worker, req.clone()).await;
        assert_eq!(events, vec![WorkerEvent::started(req.project_id, 2)]);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_worker_error() {
        let worker = ProcessWorker::new(ProcessWorkerConfig {
            command: "/definitely/not/a/real/binary".to_string(),
            args: vec![],
            working_dir: None,
            env_vars: HashMap::new(),
        });
        let (result, events) = collect(&worker, request()).await;
        assert!(matches!(result, Err(DomainError::WorkerError(_))));
        assert!(events.is_empty());
    }
}
