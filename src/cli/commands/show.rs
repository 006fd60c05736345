//! `reposcore show`: one project with its timeline and bug counts.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::id_resolver::resolve_project_id;
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{format_duration_secs, output, CommandOutput};
use crate::domain::models::{Config, Project, ProjectStatus};
use crate::services::{BugAggregator, BugCounts};
use crate::adapters::sqlite::SqliteBugRepository;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Project ID or unique prefix
    pub id: String,
}

/// Full view of a project.
#[derive(Debug, Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub bugs: BugCounts,
}

impl ProjectDetails {
    pub async fn load(ctx: &AppContext, project: Project) -> Result<Self> {
        let aggregator = BugAggregator::new(ctx.bugs.clone());
        let bugs = aggregator.bugs_for(project.id).await?;
        Ok(Self {
            bugs: BugAggregator::<SqliteBugRepository>::counts(&bugs),
            project,
        })
    }
}

impl CommandOutput for ProjectDetails {
    fn to_human(&self) -> String {
        let p = &self.project;
        let mut lines = vec![
            format!("Project:   {}", p.id),
            format!("Repo:      {}", p.repo_url),
            format!("Team:      {} (leader {})", p.team_name, p.leader_name),
            format!("Branch:    {}", p.branch_name),
            format!("Status:    {}", p.status),
            format!(
                "Attempt:   {}/{} (retries used {})",
                p.current_attempt(),
                p.max_retries + 1,
                p.retry_count
            ),
            format!("Submitted: {}", p.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
        ];

        if let Some(done) = p.completed_at {
            lines.push(format!(
                "Finished:  {} (after {})",
                done.format("%Y-%m-%d %H:%M:%S UTC"),
                format_duration_secs(p.elapsed_secs())
            ));
        }
        if p.status == ProjectStatus::Completed {
            lines.push(format!("Commits:   {}", p.commit_count));
            if let Some(summary) = p.summary {
                lines.push(format!(
                    "Errors:    {} fixed of {} across {} files",
                    summary.clamped_fixed_errors(),
                    summary.total_errors,
                    summary.total_files
                ));
            }
            if let Some(score) = p.score {
                lines.push(format!("Score:     {score}"));
            }
        }
        if let Some(reason) = &p.failure_reason {
            lines.push(format!("Reason:    {reason}"));
        }
        if self.bugs.total > 0 {
            lines.push(format!(
                "Bugs:      {} total, {} fixed, {} pending, {} failed ({:.1}% fixed)",
                self.bugs.total, self.bugs.fixed, self.bugs.pending, self.bugs.failed, self.bugs.success_rate
            ));
        }

        lines.push(String::new());
        lines.push(TableFormatter::new().format_timeline(p.timeline.entries()));
        lines.join("\n")
    }
}

pub async fn execute(args: ShowArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let id = resolve_project_id(&ctx.pool, &args.id).await?;
    let manager = ctx.manager();
    let project = manager.get_project(id).await?;
    manager.shutdown().await;

    let details = ProjectDetails::load(&ctx, project).await?;
    output(&details, json_mode);
    Ok(())
}
