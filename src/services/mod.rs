//! Application services.
//!
//! The lifecycle manager composes the smaller services: branch naming,
//! timeline bookkeeping, retry decisions, scoring, bug aggregation and the
//! bounded worker pool.

pub mod branch_name;
pub mod bug_aggregator;
pub mod lifecycle_manager;
pub mod retry_coordinator;
pub mod score_calculator;
pub mod timeline_tracker;
pub mod worker_pool;

pub use branch_name::BranchNameGenerator;
pub use bug_aggregator::{BugAggregator, BugCounts};
pub use lifecycle_manager::{
    DiscardReason, EventOutcome, ManagerSettings, OrchestratorStats, ProjectLifecycleManager,
    CANCELLED_REASON, ORCHESTRATOR_LOST_REASON, STALE_AFTER_TIMEOUTS,
};
pub use retry_coordinator::{RetryCoordinator, RetryDecision, RetryPolicy};
pub use score_calculator::{BonusScoring, ScoreCalculator, ScoreInput, ScoringPolicy};
pub use timeline_tracker::TimelineTracker;
pub use worker_pool::{WorkerPool, WorkerPoolConfig};
