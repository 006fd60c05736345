//! CLI type definitions
//!
//! Top-level clap structures. Each subcommand's arguments live next to its
//! implementation in [`crate::cli::commands`].

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    bugs::BugsArgs, cancel::CancelArgs, init::InitArgs, list::ListArgs, show::ShowArgs,
    stats::StatsArgs, submit::SubmitArgs, submit_batch::SubmitBatchArgs, watch::WatchArgs,
};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(name = "reposcore")]
#[command(about = "Reposcore - repository analysis job orchestrator", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .reposcore/
    #[arg(short, long, global = true, env = "REPOSCORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => ConfigLoader::load_from_file(path),
            None => ConfigLoader::load(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration and database in the current directory
    Init(InitArgs),

    /// Submit a repository for analysis and follow it to completion
    Submit(SubmitArgs),

    /// Submit every repository listed in a YAML file and follow them to completion
    SubmitBatch(SubmitBatchArgs),

    /// Show a project with its timeline
    Show(ShowArgs),

    /// List projects
    List(ListArgs),

    /// List the bugs found in a project
    Bugs(BugsArgs),

    /// Cancel a pending or running project
    Cancel(CancelArgs),

    /// Poll a project until it finishes
    Watch(WatchArgs),

    /// Show project and bug statistics
    Stats(StatsArgs),
}
