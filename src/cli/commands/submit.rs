//! `reposcore submit`: create a project and run it to completion in-process.

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use super::show::ProjectDetails;
use super::watch::follow;
use crate::cli::context::AppContext;
use crate::domain::models::Config;
use crate::cli::output::output;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Repository URL (https://, git://, ssh:// or git@host:path)
    pub repo_url: String,

    /// Team name
    #[arg(short, long)]
    pub team: String,

    /// Team leader name
    #[arg(short, long)]
    pub leader: String,

    /// Retries after the first attempt (defaults to retry.max_retries)
    #[arg(short, long)]
    pub max_retries: Option<u32>,
}

pub async fn execute(args: SubmitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let manager = ctx.runner();

    let project = match manager
        .create_project(&args.repo_url, &args.team, &args.leader, args.max_retries)
        .await
    {
        Ok(project) => project,
        Err(e) => {
            manager.shutdown().await;
            return Err(e.into());
        }
    };
    if !json_mode {
        eprintln!("Submitted project {} on branch {}", project.id, project.branch_name);
    }

    let interval = Duration::from_secs(config.polling.interval_secs.max(1));
    let finished = tokio::select! {
        result = follow(&manager, project.id, interval, None, json_mode) => result,
        signal = shutdown_signal() => {
            tracing::info!(project_id = %project.id, signal, "interrupted, cancelling project");
            manager.cancel_project(project.id).await.map_err(anyhow::Error::from)
        }
    };
    manager.shutdown().await;

    let details = ProjectDetails::load(&ctx, finished?).await?;
    output(&details, json_mode);
    Ok(())
}

/// Resolves with the signal's name on Ctrl-C, SIGTERM or SIGHUP.
pub(crate) async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(mut terminate), Ok(mut hangup)) => tokio::select! {
                Ok(()) = tokio::signal::ctrl_c() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = hangup.recv() => "SIGHUP",
                else => std::future::pending().await,
            },
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "failed to install SIGTERM/SIGHUP handlers, listening for Ctrl-C only");
                ctrl_c().await
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending().await
        }
    }
}
