//! Batch submission requests and their outcome.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Most requests accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 50;

/// One repository to analyse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub repo_url: String,
    pub team_name: String,
    pub leader_name: String,
    /// Retries after the first attempt; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<SubmissionRequest>,
    /// Keep submitting after a request is rejected
    #[serde(default)]
    pub continue_on_error: bool,
}

impl BatchRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.requests.is_empty() {
            return Err(DomainError::validation("requests", "at least one request is required"));
        }
        if self.requests.len() > MAX_BATCH_SIZE {
            return Err(DomainError::validation(
                "requests",
                format!(
                    "at most {MAX_BATCH_SIZE} requests per batch, got {}",
                    self.requests.len()
                ),
            ));
        }
        Ok(())
    }
}

/// A request that was not submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Position in [`BatchRequest::requests`]
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSubmission {
    /// Created projects, in request order
    pub project_ids: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
    /// Requests never tried because an earlier one was rejected
    pub skipped: usize,
}

impl BatchSubmission {
    pub fn count(&self) -> usize {
        self.project_ids.len()
    }
}
