pub mod bug;
pub mod config;
pub mod project;
pub mod submission;
pub mod timeline;
pub mod worker_event;

pub use bug::{Bug, BugStatus, BugType};
pub use config::{
    Config, DatabaseConfig, LoggingConfig, PollingConfig, RetryConfig, ScoringConfig, WorkerConfig,
};
pub use project::{
    validate_name, validate_repo_url, Project, ProjectStatus, RunSummary, DEFAULT_MAX_RETRIES,
};
pub use submission::{BatchFailure, BatchRequest, BatchSubmission, SubmissionRequest, MAX_BATCH_SIZE};
pub use timeline::{Timeline, TimelineEntry, TimelineStatus, TimelineUpdate};
pub use worker_event::{CompletionReport, EventKey, WorkerEvent, WorkerEventKind};
