//! `reposcore stats`

use anyhow::Result;
use clap::Args;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::services::OrchestratorStats;

#[derive(Args, Debug)]
pub struct StatsArgs {}

impl CommandOutput for OrchestratorStats {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Projects: {}", self.total_projects)];
        for (status, n) in &self.projects_by_status {
            lines.push(format!("  {status:<10} {n}"));
        }
        lines.push(format!("Bugs: {}", self.total_bugs));
        for (status, n) in &self.bugs_by_status {
            lines.push(format!("  {status:<10} {n}"));
        }
        if !self.bugs_by_type.is_empty() {
            lines.push("Bugs by type:".to_string());
            for (bug_type, n) in &self.bugs_by_type {
                lines.push(format!("  {bug_type:<12} {n}"));
            }
        }
        lines.join("\n")
    }
}

pub async fn execute(_args: StatsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let manager = ctx.manager();
    let stats = manager.stats().await?;
    manager.shutdown().await;

    output(&stats, json_mode);
    Ok(())
}
