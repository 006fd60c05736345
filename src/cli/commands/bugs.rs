//! `reposcore bugs`

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::adapters::sqlite::SqliteBugRepository;
use crate::cli::context::AppContext;
use crate::cli::id_resolver::resolve_project_id;
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, short_id, CommandOutput};
use crate::domain::models::{Bug, Config};
use crate::services::{BugAggregator, BugCounts};

type Aggregator = BugAggregator<SqliteBugRepository>;

#[derive(Args, Debug)]
pub struct BugsArgs {
    /// Project ID or unique prefix
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct BugListOutput {
    pub project_id: Uuid,
    pub counts: BugCounts,
    pub by_type: BTreeMap<String, u64>,
    pub bugs: Vec<Bug>,
}

impl CommandOutput for BugListOutput {
    fn to_human(&self) -> String {
        if self.bugs.is_empty() {
            return format!("No bugs recorded for project {}.", short_id(&self.project_id));
        }

        let by_type = self
            .by_type
            .iter()
            .map(|(t, n)| format!("{t}={n}"))
            .collect::<Vec<_>>()
            .join(", ");
        [
            format!(
                "{} bug(s): {} fixed, {} pending, {} failed ({:.1}% fixed)",
                self.counts.total,
                self.counts.fixed,
                self.counts.pending,
                self.counts.failed,
                self.counts.success_rate
            ),
            format!("By type: {by_type}"),
            TableFormatter::new().format_bugs(&self.bugs),
        ]
        .join("\n")
    }
}

pub async fn execute(args: BugsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;
    let project_id = resolve_project_id(&ctx.pool, &args.id).await?;
    let manager = ctx.manager();
    let bugs = manager.get_bugs(project_id).await?;
    manager.shutdown().await;

    let out = BugListOutput {
        project_id,
        counts: Aggregator::counts(&bugs),
        by_type: Aggregator::counts_by_type(&bugs)
            .into_iter()
            .map(|(t, n)| (t.as_str().to_string(), n))
            .collect(),
        bugs,
    };
    output(&out, json_mode);
    Ok(())
}
