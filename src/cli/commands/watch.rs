//! `reposcore watch`: poll a project until it finishes.

use anyhow::{bail, Result};
use clap::Args;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::show::ProjectDetails;
use crate::cli::context::{AppContext, SqliteManager};
use crate::cli::id_resolver::resolve_project_id;
use crate::cli::output::progress::{create_spinner, ProgressBarExt};
use crate::cli::output::{output, short_id};
use crate::domain::models::{Config, Project, ProjectStatus};

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Project ID or unique prefix
    pub id: String,

    /// Seconds between polls (defaults to polling.interval_secs)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Give up after this many seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

/// Re-read the project every `interval` until it is terminal.
pub(crate) async fn follow(
    manager: &SqliteManager,
    project_id: Uuid,
    interval: Duration,
    timeout: Option<Duration>,
    json_mode: bool,
) -> Result<Project> {
    let spinner = create_spinner(json_mode);
    let started = Instant::now();

    loop {
        let project = manager.get_project(project_id).await?;
        if project.is_terminal() {
            match project.status {
                ProjectStatus::Completed => spinner.finish_success(format!(
                    "{} completed, score {}",
                    short_id(&project.id),
                    project.score.unwrap_or_default()
                )),
                _ => spinner.finish_error(format!(
                    "{} failed: {}",
                    short_id(&project.id),
                    project.failure_reason.as_deref().unwrap_or("unknown reason")
                )),
            }
            return Ok(project);
        }

        spinner.set_message(format!(
            "{} {} (attempt {}/{})",
            short_id(&project.id),
            project.status,
            project.current_attempt(),
            project.max_retries + 1
        ));

        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                spinner.finish_error("timed out");
                bail!(
                    "Timed out after {}s waiting for project {}",
                    limit.as_secs(),
                    project.id
                );
            }
        }
        tokio::time::sleep(interval).await;
    }
}

pub async fn execute(args: WatchArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let id = resolve_project_id(&ctx.pool, &args.id).await?;
    let interval = Duration::from_secs(args.interval.unwrap_or(config.polling.interval_secs).max(1));

    let manager = ctx.manager();
    let result = follow(&manager, id, interval, args.timeout.map(Duration::from_secs), json_mode).await;
    manager.shutdown().await;

    let details = ProjectDetails::load(&ctx, result?).await?;
    output(&details, json_mode);
    Ok(())
}
