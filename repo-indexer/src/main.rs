use anyhow::Result;
use clap::Parser;
use repo_indexer::cli::{run, Cli, Commands};
use repo_indexer::load_config::{load_dotenv, LogConfig};
use repo_indexer::logging::init_tracing;

/// Log settings are needed before the full config (and its secrets) is loaded, so the
/// `log` section is read on its own first. Falls back to defaults if that fails; the full
/// load in `run` reports the real error.
fn log_config(cli: &Cli) -> LogConfig {
    #[derive(serde::Deserialize)]
    struct LogOnly {
        #[serde(default)]
        log: LogConfig,
    }

    let Commands::Sync { config } = &cli.command;
    std::fs::read_to_string(config)
        .ok()
        .and_then(|content| serde_yaml::from_str::<LogOnly>(&content).ok())
        .map(|parsed| parsed.log)
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&log_config(&cli))?;
    load_dotenv();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
