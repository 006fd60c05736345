//! `reposcore submit-batch`: submit every request in a YAML file and follow
//! the created projects until all of them finish.
//!
//! ```yaml
//! continue_on_error: true
//! requests:
//!   - repo_url: https://github.com/acme/widgets
//!     team_name: Acme
//!     leader_name: Jo
//!     max_retries: 2
//! ```

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use super::submit::shutdown_signal;
use crate::cli::context::{AppContext, SqliteManager};
use crate::cli::output::progress::{create_spinner, ProgressBarExt};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{BatchFailure, BatchRequest, Config, Project, ProjectStatus};

#[derive(Args, Debug)]
pub struct SubmitBatchArgs {
    /// YAML file with `requests` and an optional `continue_on_error`
    pub file: PathBuf,

    /// Keep submitting after a request is rejected, whatever the file says
    #[arg(long)]
    pub continue_on_error: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchOutput {
    pub count: usize,
    pub failed: Vec<BatchFailure>,
    pub skipped: usize,
    pub projects: Vec<Project>,
}

impl CommandOutput for BatchOutput {
    fn to_human(&self) -> String {
        let completed = self
            .projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Completed)
            .count();
        let mut out = format!(
            "Submitted {} project(s), {} completed, {} failed\n",
            self.count,
            completed,
            self.projects.len() - completed
        );
        if !self.projects.is_empty() {
            out.push_str(&TableFormatter::new().format_projects(&self.projects));
            out.push('\n');
        }
        for failure in &self.failed {
            out.push_str(&format!("Request {} rejected: {}\n", failure.index, failure.error));
        }
        if self.skipped > 0 {
            out.push_str(&format!("{} request(s) skipped after the first rejection\n", self.skipped));
        }
        out.trim_end().to_string()
    }
}

pub(crate) fn load_batch(path: &Path) -> Result<BatchRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batch file {}", path.display()))?;
    let batch: BatchRequest = serde_yaml::from_str(&text)
        .with_context(|| format!("Invalid batch file {}", path.display()))?;
    batch.validate()?;
    Ok(batch)
}

/// Poll until every project is terminal, showing progress on one spinner.
async fn follow_all(
    manager: &SqliteManager,
    project_ids: &[Uuid],
    interval: Duration,
    json_mode: bool,
) -> Result<Vec<Project>> {
    let spinner = create_spinner(json_mode);
    loop {
        let mut projects = Vec::with_capacity(project_ids.len());
        for id in project_ids {
            projects.push(manager.get_project(*id).await?);
        }

        let finished = projects.iter().filter(|p| p.is_terminal()).count();
        if finished == projects.len() {
            spinner.finish_success(format!("{finished} project(s) finished"));
            return Ok(projects);
        }
        spinner.set_message(format!("{finished}/{} projects finished", projects.len()));
        tokio::time::sleep(interval).await;
    }
}

/// Cancel what is still unfinished and return the final state of all projects.
async fn cancel_unfinished(manager: &SqliteManager, project_ids: &[Uuid]) -> Result<Vec<Project>> {
    let mut projects = Vec::with_capacity(project_ids.len());
    for id in project_ids {
        let project = manager.get_project(*id).await?;
        if project.is_terminal() {
            projects.push(project);
            continue;
        }
        match manager.cancel_project(*id).await {
            Ok(cancelled) => projects.push(cancelled),
            // Finished between the read and the cancel.
            Err(_) => projects.push(manager.get_project(*id).await?),
        }
    }
    Ok(projects)
}

pub async fn execute(args: SubmitBatchArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut batch = load_batch(&args.file)?;
    batch.continue_on_error |= args.continue_on_error;

    let ctx = AppContext::open(config).await?;
    let manager = ctx.runner();

    let submission = match manager.submit_batch(&batch).await {
        Ok(submission) => submission,
        Err(e) => {
            manager.shutdown().await;
            return Err(e.into());
        }
    };
    if !json_mode {
        eprintln!(
            "Submitted {} of {} request(s)",
            submission.count(),
            batch.requests.len()
        );
    }

    let interval = Duration::from_secs(config.polling.interval_secs.max(1));
    let finished = tokio::select! {
        result = follow_all(&manager, &submission.project_ids, interval, json_mode) => result,
        signal = shutdown_signal() => {
            tracing::info!(signal, count = submission.count(), "interrupted, cancelling batch");
            cancel_unfinished(&manager, &submission.project_ids).await
        }
    };
    manager.shutdown().await;

    let out = BatchOutput {
        count: submission.count(),
        failed: submission.failed,
        skipped: submission.skipped,
        projects: finished?,
    };
    output(&out, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_batch_reads_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "continue_on_error: true\nrequests:\n  - repo_url: https://github.com/acme/widgets\n    team_name: Acme\n    leader_name: Jo"
        )
        .unwrap();

        let batch = load_batch(file.path()).unwrap();
        assert!(batch.continue_on_error);
        assert_eq!(batch.requests.len(), 1);
        assert_eq!(batch.requests[0].team_name, "Acme");
    }

    #[test]
    fn test_load_batch_rejects_empty_and_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "requests: []").unwrap();
        assert!(load_batch(file.path()).is_err());

        let err = load_batch(Path::new("/nonexistent/batch.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read batch file"));
    }

    #[test]
    fn test_human_output_lists_rejections() {
        let out = BatchOutput {
            count: 0,
            failed: vec![BatchFailure {
                index: 1,
                error: "Invalid team_name: must not be empty".to_string(),
            }],
            skipped: 2,
            projects: Vec::new(),
        };
        let text = out.to_human();
        assert!(text.starts_with("Submitted 0 project(s)"));
        assert!(text.contains("Request 1 rejected: Invalid team_name"));
        assert!(text.contains("2 request(s) skipped"));
    }
}
