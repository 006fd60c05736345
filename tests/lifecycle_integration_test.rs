//! End-to-end lifecycle tests through the public API.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{db_url, fast_settings, memory_manager, open_manager, wait_terminal, REPO_URL};
use reposcore::adapters::workers::{MockBehavior, MockWorker};
use reposcore::domain::models::{
    BatchRequest, Bug, BugStatus, BugType, ProjectStatus, RunSummary, SubmissionRequest, TimelineStatus,
    WorkerEvent,
};
use reposcore::domain::ports::ProjectFilter;
use reposcore::services::score_calculator::score;
use reposcore::services::{EventOutcome, WorkerPoolConfig, ORCHESTRATOR_LOST_REASON};
use reposcore::DomainError;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_run_completes_with_score_and_bugs() {
    let bugs = vec![
        Bug::new(uuid::Uuid::nil(), "app.py", BugType::Syntax, 1, "missing colon").with_fix("added colon"),
        Bug::new(uuid::Uuid::nil(), "app.py", BugType::Logic, 9, "wrong operator")
            .with_status(BugStatus::Failed),
        Bug::new(uuid::Uuid::nil(), "util.py", BugType::Import, 2, "unused import"),
    ];
    let worker = MockWorker::new(MockBehavior::success_with_bugs(8, RunSummary::new(20, 5, 5), bugs));
    let manager = memory_manager(Arc::new(worker.clone()), fast_settings()).await;

    let project = assert_ok!(
        manager
            .create_project(REPO_URL, "  Code Crushers ", "Ada Lovelace", None)
            .await
    );
    assert_eq!(project.branch_name, "CODE_CRUSHERS_ADA_LOVELACE_AI_Fix");
    assert_eq!(project.max_retries, 5);

    let done = wait_terminal(&manager, project.id, Duration::from_secs(5)).await;
    assert_eq!(done.status, ProjectStatus::Completed);
    assert_eq!(done.score, Some(score(100, done.elapsed_secs(), 8, 5, 5)));
    assert!(done.score.unwrap() >= 100);

    let recorded = manager.get_bugs(project.id).await.unwrap();
    let statuses: Vec<BugStatus> = recorded.iter().map(|b| b.status).collect();
    assert_eq!(statuses, vec![BugStatus::Fixed, BugStatus::Pending, BugStatus::Failed]);

    let launches = worker.launches().await;
    assert_eq!(launches.len(), 1);
    assert_eq!(launches[0].branch_name, "CODE_CRUSHERS_ADA_LOVELACE_AI_Fix");
    manager.shutdown().await;
}

#[tokio::test]
async fn test_failing_worker_exhausts_retries() {
    let worker = MockWorker::new(MockBehavior::failure("tests still failing"));
    let manager = memory_manager(Arc::new(worker.clone()), fast_settings()).await;

    let project = manager.create_project(REPO_URL, "Team", "Lead", Some(5)).await.unwrap();
    let done = wait_terminal(&manager, project.id, Duration::from_secs(10)).await;

    assert_eq!(done.status, ProjectStatus::Failed);
    assert_eq!(done.retry_count, 5);
    assert_eq!(done.failure_reason.as_deref(), Some("tests still failing"));

    let timeline = manager.get_timeline(project.id).await.unwrap();
    let attempts: Vec<u32> = timeline.iter().map(|e| e.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 3, 4, 5, 6]);
    assert!(timeline.iter().all(|e| e.status == TimelineStatus::Failed));
    assert_eq!(worker.launches().await.last().map(|r| r.attempt), Some(6));
    manager.shutdown().await;
}

#[tokio::test]
async fn test_zero_retries_fails_on_first_error() {
    let worker = MockWorker::new(MockBehavior::failure("clone failed"));
    let manager = memory_manager(Arc::new(worker), fast_settings()).await;

    let project = manager.create_project(REPO_URL, "Team", "Lead", Some(0)).await.unwrap();
    let done = wait_terminal(&manager, project.id, Duration::from_secs(5)).await;
    assert_eq!(done.status, ProjectStatus::Failed);
    assert_eq!(done.timeline.len(), 1);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_validation_errors_name_the_field() {
    let worker = MockWorker::new(MockBehavior::Hang { started: false });
    let manager = memory_manager(Arc::new(worker), fast_settings()).await;

    for (url, team, leader, field) in [
        ("not a url", "Team", "Lead", "repo_url"),
        ("ftp://example.com/repo", "Team", "Lead", "repo_url"),
        (REPO_URL, "", "Lead", "team_name"),
        (REPO_URL, "Team", "___", "leader_name"),
    ] {
        let err = assert_err!(manager.create_project(url, team, leader, None).await);
        match err {
            DomainError::Validation { field: f, .. } => assert_eq!(f, field, "input {url:?} {team:?} {leader:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
    assert!(manager.list_projects(ProjectFilter::default()).await.unwrap().is_empty());
    manager.shutdown().await;
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let worker = MockWorker::new(MockBehavior::success(1, RunSummary::new(1, 0, 0)))
        .with_event_delay(Duration::from_millis(30));
    let mut settings = fast_settings();
    settings.pool = WorkerPoolConfig {
        max_concurrent: 2,
        event_timeout: Duration::from_secs(5),
    };
    let manager = memory_manager(Arc::new(worker.clone()), settings).await;

    let mut ids = Vec::new();
    for i in 0..6 {
        let p = manager
            .create_project(REPO_URL, &format!("Team {i}"), "Lead", None)
            .await
            .unwrap();
        ids.push(p.id);
    }
    for id in ids {
        let done = wait_terminal(&manager, id, Duration::from_secs(10)).await;
        assert_eq!(done.status, ProjectStatus::Completed);
    }
    assert!(worker.peak_running() <= 2);

    let listed = manager
        .list_projects(ProjectFilter {
            team_name: Some("Team 3".to_string()),
            ..ProjectFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_cancel_then_late_events_are_ignored() {
    let worker = MockWorker::new(MockBehavior::Hang { started: true });
    let manager = memory_manager(Arc::new(worker.clone()), fast_settings()).await;
    let project = manager.create_project(REPO_URL, "Team", "Lead", None).await.unwrap();

    for _ in 0..200 {
        if manager.get_project(project.id).await.unwrap().status == ProjectStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let cancelled = manager.cancel_project(project.id).await.unwrap();
    assert_eq!(cancelled.status, ProjectStatus::Failed);

    let late = WorkerEvent::completed(project.id, 1, 3, RunSummary::new(1, 1, 1));
    let outcome = manager.handle_worker_event(late).await.unwrap();
    assert!(matches!(outcome, EventOutcome::Discarded(_)));

    let after = manager.get_project(project.id).await.unwrap();
    assert_eq!(after.status, ProjectStatus::Failed);
    assert_eq!(after.score, None);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_stats_reflect_finished_runs() {
    let worker = MockWorker::new(MockBehavior::success(3, RunSummary::new(2, 2, 1)));
    worker.set_attempt_behavior(1, MockBehavior::failure("flaky")).await;
    let manager = memory_manager(Arc::new(worker), fast_settings()).await;

    let ok = manager.create_project(REPO_URL, "Alpha", "Ann", None).await.unwrap();
    let failed = manager.create_project(REPO_URL, "Beta", "Bob", Some(0)).await.unwrap();
    wait_terminal(&manager, ok.id, Duration::from_secs(5)).await;
    wait_terminal(&manager, failed.id, Duration::from_secs(5)).await;

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.total_projects, 2);
    assert_eq!(stats.projects_by_status.get("completed"), Some(&1));
    assert_eq!(stats.projects_by_status.get("failed"), Some(&1));
    assert_eq!(stats.active_attempts, 0);
    manager.shutdown().await;
}

#[tokio::test]
async fn test_restarted_orchestrator_recovers_abandoned_project() {
    let dir = tempfile::tempdir().unwrap();
    let url = db_url(&dir);

    let hung = MockWorker::new(MockBehavior::Hang { started: true });
    let first = open_manager(&url, Arc::new(hung), fast_settings()).await;
    let id = first.create_project(REPO_URL, "Team", "Lead", None).await.unwrap().id;
    for _ in 0..200 {
        if first.get_project(id).await.unwrap().status == ProjectStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    // The owning process goes away mid-attempt.
    first.shutdown().await;

    let mut settings = fast_settings();
    settings.pool.event_timeout = Duration::from_millis(200);
    let worker = MockWorker::new(MockBehavior::success(2, RunSummary::new(3, 1, 1)));
    let second = open_manager(&url, Arc::new(worker.clone()), settings).await;
    second.spawn_recovery_loop();

    let done = wait_terminal(&second, id, Duration::from_secs(5)).await;
    assert_eq!(done.status, ProjectStatus::Completed);
    assert_eq!(done.retry_count, 1);
    let lost = &done.timeline.entries()[0];
    assert_eq!(lost.status, TimelineStatus::Failed);
    assert!(lost.error.as_deref().unwrap().starts_with(ORCHESTRATOR_LOST_REASON));
    assert_eq!(worker.launches().await.iter().map(|r| r.attempt).collect::<Vec<_>>(), vec![2]);
    second.shutdown().await;
}

#[tokio::test]
async fn test_batch_runs_every_accepted_request() {
    let worker = MockWorker::new(MockBehavior::success(1, RunSummary::new(2, 1, 1)));
    let manager = memory_manager(Arc::new(worker), fast_settings()).await;
    let request = |repo_url: &str, team: &str| SubmissionRequest {
        repo_url: repo_url.to_string(),
        team_name: team.to_string(),
        leader_name: "Lead".to_string(),
        max_retries: None,
    };
    let batch = BatchRequest {
        requests: vec![
            request(REPO_URL, "Alpha"),
            request("ftp://example.com/repo", "Beta"),
            request("git@github.com:acme/gadgets.git", "Gamma"),
        ],
        continue_on_error: true,
    };

    let submission = assert_ok!(manager.submit_batch(&batch).await);
    assert_eq!(submission.count(), 2);
    assert_eq!(submission.failed.len(), 1);
    assert_eq!(submission.failed[0].index, 1);
    assert!(submission.failed[0].error.contains("repo_url"));

    for id in &submission.project_ids {
        let done = wait_terminal(&manager, *id, Duration::from_secs(5)).await;
        assert_eq!(done.status, ProjectStatus::Completed);
    }
    manager.shutdown().await;
}
