//! `reposcore cancel`

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::context::AppContext;
use crate::cli::id_resolver::resolve_project_id;
use crate::cli::output::{output, short_id, CommandOutput};
use crate::domain::models::{Config, ProjectStatus};

#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Project ID or unique prefix
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelOutput {
    pub id: Uuid,
    pub status: ProjectStatus,
    pub attempt: u32,
    pub failure_reason: Option<String>,
}

impl CommandOutput for CancelOutput {
    fn to_human(&self) -> String {
        format!("Cancelled project {} during attempt {}.", short_id(&self.id), self.attempt)
    }
}

pub async fn execute(args: CancelArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let id = resolve_project_id(&ctx.pool, &args.id).await?;
    let manager = ctx.manager();
    let result = manager.cancel_project(id).await;
    manager.shutdown().await;
    let project = result?;

    let out = CancelOutput {
        id: project.id,
        status: project.status,
        attempt: project.current_attempt(),
        failure_reason: project.failure_reason,
    };
    output(&out, json_mode);
    Ok(())
}
