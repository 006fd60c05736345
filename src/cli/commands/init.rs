//! Implementation of the `reposcore init` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::{database_url, initialize_database};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: Option<PathBuf>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nWrote {CONFIG_DIR}/config.yaml"));
        }
        if let Some(db) = &self.database_path {
            lines.push(format!("Database initialized at {}", db.display()));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let config_dir = target_path.join(CONFIG_DIR);

    if config_dir.exists() && !args.force {
        let out = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            config_written: false,
            database_path: None,
        };
        output(&out, json_mode);
        return Ok(());
    }

    if args.force && config_dir.exists() {
        fs::remove_dir_all(&config_dir)
            .await
            .with_context(|| format!("Failed to remove existing {CONFIG_DIR} directory"))?;
    }
    fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let yaml = serde_yaml::to_string(&Config::default()).context("Failed to render default config")?;
    fs::write(config_dir.join("config.yaml"), yaml)
        .await
        .context("Failed to write config.yaml")?;

    let db_path = database_path(&target_path, &config.database.path);
    initialize_database(&database_url(&db_path), None)
        .await
        .context("Failed to initialize database")?;

    let out = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        config_written: true,
        database_path: Some(db_path),
    };
    output(&out, json_mode);
    Ok(())
}

/// Relative database paths are resolved against the target directory.
fn database_path(target: &Path, configured: &str) -> PathBuf {
    let configured = Path::new(configured.trim_start_matches("sqlite:"));
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        target.join(configured)
    }
}
