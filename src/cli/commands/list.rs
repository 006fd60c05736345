//! `reposcore list`

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Project, ProjectStatus};
use crate::domain::ports::ProjectFilter;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status (pending, running, completed, failed)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Filter by team name (substring match)
    #[arg(short, long)]
    pub team: Option<String>,

    /// Maximum number of projects to display
    #[arg(short, long, default_value = "50")]
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct ProjectListOutput {
    pub projects: Vec<Project>,
    pub total: usize,
}

impl CommandOutput for ProjectListOutput {
    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }
        format!(
            "Found {} project(s):\n{}",
            self.total,
            TableFormatter::new().format_projects(&self.projects)
        )
    }
}

pub async fn execute(args: ListArgs, config: &Config, json_mode: bool) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(|s| ProjectStatus::from_str(s).ok_or_else(|| anyhow!("Invalid status: {s}")))
        .transpose()?;

    let ctx = AppContext::open(config).await?;
    let manager = ctx.manager();
    let projects = manager
        .list_projects(ProjectFilter {
            status,
            team_name: args.team,
            limit: Some(args.limit.max(1)),
            ..ProjectFilter::default()
        })
        .await?;
    manager.shutdown().await;

    let out = ProjectListOutput {
        total: projects.len(),
        projects,
    };
    output(&out, json_mode);
    Ok(())
}
