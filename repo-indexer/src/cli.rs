/// # repo-indexer CLI Interface (Module)
///
/// Command parsing and the async `run` entrypoint. All crawl, filter, index and reconcile
/// logic lives in `repo-indexer-core`; this module wires the HTTP adapters to it.
///
/// ## How To Use
/// - From the command line: `repo-indexer sync --config indexer.yml`.
/// - Programmatically or from integration tests: call [`run`] with a constructed [`Cli`].
use crate::index_client::SearchIndexClient;
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use repo_indexer_core::error::SyncError;
use repo_indexer_core::fetch::HttpFetcher;
use repo_indexer_core::synchronise::{synchronise, RunContext};
use std::path::PathBuf;

/// CLI for repo-indexer: mirror hosted repositories into a search index.
#[derive(Parser)]
#[clap(
    name = "repo-indexer",
    version,
    about = "Crawl hosted git repositories, index their files and prune vanished documents"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one crawl-and-reconcile pass using the given config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    // Test hook: first event of every invocation.
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "sync", "Starting synchronisation process");

            let fetcher = HttpFetcher::new(config.credentials.clone())?;
            let index = SearchIndexClient::new(config.index.clone())?;
            let mut ctx = RunContext::start_now(&config.crawl);

            match synchronise(&config.crawl, &mut ctx, &fetcher, &index).await {
                Ok(report) => {
                    tracing::info!(
                        command = "sync",
                        repositories = report.repositories.len(),
                        failed = report.failed.len(),
                        files_indexed = report.files_indexed(),
                        ?report,
                        "Synchronisation complete"
                    );
                    Ok(())
                }
                // Nothing was fetched or deleted yet; the next scheduled run retries.
                Err(SyncError::IndexUnreachable { attempts }) => {
                    tracing::error!(
                        command = "sync",
                        attempts,
                        "Index service not reachable, stopping without changes"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    Err(e.into())
                }
            }
        }
    }
}
