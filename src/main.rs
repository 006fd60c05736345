//! Reposcore CLI entry point.

use clap::Parser;

use reposcore::cli::{commands, handle_error, Cli, Commands};
use reposcore::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.global.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.global.load_config()?;

    let mut log_config = LogConfig::try_from(&config.logging).map_err(anyhow::Error::msg)?;
    if cli.global.verbose {
        log_config = log_config.verbose();
    }
    let _logger = LoggerImpl::init(&log_config)?;

    let json = cli.global.json;
    match cli.command {
        Commands::Init(args) => commands::init::execute(args, &config, json).await,
        Commands::Submit(args) => commands::submit::execute(args, &config, json).await,
        Commands::SubmitBatch(args) => commands::submit_batch::execute(args, &config, json).await,
        Commands::Show(args) => commands::show::execute(args, &config, json).await,
        Commands::List(args) => commands::list::execute(args, &config, json).await,
        Commands::Bugs(args) => commands::bugs::execute(args, &config, json).await,
        Commands::Cancel(args) => commands::cancel::execute(args, &config, json).await,
        Commands::Watch(args) => commands::watch::execute(args, &config, json).await,
        Commands::Stats(args) => commands::stats::execute(args, &config, json).await,
    }
}
