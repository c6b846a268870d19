//! High-level pipeline: orchestrates crawl → stage → index → reconcile for every configured
//! repository source.
//!
//! This module provides the top-level orchestration for one run. It:
//!   - prepares the run's staging directory (best effort)
//!   - waits for the index service to answer (bounded retries)
//!   - enumerates repositories from the public feed, the configured users and the configured
//!     organisations, in that order, and walks each one not excluded by name
//!   - after a settling delay, reconciles the index against what this run refreshed
//!
//! # Major Types
//! - [`RunContext`]: per-run state (staging directory, probe retry counter)
//! - [`SynchroniseReport`]: what was walked, indexed, failed and deleted
//!
//! # Error Handling
//! With [`FailurePolicy::Abort`] (the default) the first failed listing or repository walk
//! ends the run with a [`SyncError`] and reconciliation never happens. With
//! [`FailurePolicy::Continue`] failures are collected in the report, and reconciliation is
//! skipped if there were any, since documents of a failed repository were not refreshed and
//! would be deleted as stale.
//!
//! Per-file failures (a staging write or an index submission) never fail the run, under
//! either policy. They are counted in [`WalkStats`], and reconciliation is skipped when any
//! repository reports one, for the same reason: the entry for that file kept its old index
//! date and falls inside the deletion window.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::config::{CrawlConfig, FailurePolicy, HostingConfig};
use crate::contract::{ContentFetcher, IndexClient, WindowQuery};
use crate::error::SyncError;
use crate::filter::FilterPolicy;
use crate::probe::StartupProbe;
use crate::reconcile::{ReconcileReport, ReconciliationEngine};
use crate::stage::StagingRun;
use crate::walk::{TreeWalker, WalkStats};

/// Where a list of repositories comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    AllPublic,
    NamedUser(String),
    NamedOrg(String),
}

impl RepositorySource {
    /// Public feed first (when enabled), then users, then organisations.
    pub fn from_config(hosting: &HostingConfig) -> Vec<Self> {
        let mut sources = Vec::new();
        if hosting.public_repos {
            sources.push(RepositorySource::AllPublic);
        }
        sources.extend(
            hosting
                .include_users
                .iter()
                .cloned()
                .map(RepositorySource::NamedUser),
        );
        sources.extend(
            hosting
                .include_orgs
                .iter()
                .cloned()
                .map(RepositorySource::NamedOrg),
        );
        sources
    }

    pub fn list_url(&self, base_url: &str) -> String {
        match self {
            RepositorySource::AllPublic => format!("{base_url}/repositories"),
            RepositorySource::NamedUser(user) => format!("{base_url}/users/{user}/repos"),
            RepositorySource::NamedOrg(org) => format!("{base_url}/orgs/{org}/repos"),
        }
    }
}

/// State owned by one run.
#[derive(Debug)]
pub struct RunContext {
    pub staging: StagingRun,
    pub probe: StartupProbe,
}

impl RunContext {
    pub fn new(config: &CrawlConfig, started_at: DateTime<Local>) -> Self {
        Self {
            staging: StagingRun::new(&config.data_dir, started_at),
            probe: StartupProbe::from_config(&config.run),
        }
    }

    pub fn start_now(config: &CrawlConfig) -> Self {
        Self::new(config, Local::now())
    }
}

#[derive(Debug)]
pub struct SynchroniseReport {
    pub staging_dir: PathBuf,
    pub repositories: Vec<RepositoryReport>,
    pub failed: Vec<FailedRepository>,
    /// `None` when reconciliation was skipped.
    pub reconciliation: Option<ReconcileReport>,
    pub elapsed: Duration,
}

impl SynchroniseReport {
    pub fn files_indexed(&self) -> usize {
        self.repositories.iter().map(|r| r.stats.files_indexed).sum()
    }

    pub fn files_not_indexed(&self) -> usize {
        files_not_indexed(&self.repositories)
    }
}

fn files_not_indexed(repositories: &[RepositoryReport]) -> usize {
    repositories.iter().map(|r| r.stats.files_not_indexed()).sum()
}

#[derive(Debug)]
pub struct RepositoryReport {
    pub name: String,
    pub stats: WalkStats,
}

#[derive(Debug)]
pub struct FailedRepository {
    /// Repository name, or the listing URL when the listing itself failed.
    pub name: String,
    pub error: String,
}

pub async fn synchronise<F, I>(
    config: &CrawlConfig,
    ctx: &mut RunContext,
    fetcher: &F,
    index: &I,
) -> Result<SynchroniseReport, SyncError>
where
    F: ContentFetcher,
    I: IndexClient,
{
    let started = Instant::now();
    info!(staging_dir = %ctx.staging.directory().display(), "[SYNC] Starting synchronisation run");

    ctx.staging.prepare();

    if !ctx.probe.wait_until_reachable(index).await {
        error!("[SYNC][ERROR] Index service not reachable, stopping");
        return Err(SyncError::IndexUnreachable {
            attempts: ctx.probe.attempts(),
        });
    }

    let policy = FilterPolicy::new(&config.exclude);
    let walker = TreeWalker::new(fetcher, index, &policy, &config.target);
    let on_error = config.run.on_repository_error;

    let mut repositories = Vec::new();
    let mut failed = Vec::new();

    for source in RepositorySource::from_config(&config.hosting) {
        let url = source.list_url(&config.hosting.base_url);
        info!(source = ?source, url = %url, "[SYNC] Listing repositories");
        let repos = match fetcher.list_repositories(&url).await {
            Ok(repos) => repos,
            Err(e) => {
                error!(url = %url, error = %e, "[SYNC][ERROR] Repository listing failed");
                match on_error {
                    FailurePolicy::Abort => return Err(SyncError::Listing { url, source: e }),
                    FailurePolicy::Continue => {
                        failed.push(FailedRepository {
                            name: url,
                            error: e.to_string(),
                        });
                        continue;
                    }
                }
            }
        };

        for repo in repos {
            if policy.excludes_repository(&repo.name) {
                info!(repository = %repo.name, "[SYNC] Repository excluded");
                continue;
            }
            match walker.walk_repository(&repo, &ctx.staging).await {
                Ok(stats) => {
                    ctx.staging.record_repository();
                    repositories.push(RepositoryReport {
                        name: repo.name,
                        stats,
                    });
                }
                Err(e) => {
                    error!(
                        repository = %repo.name,
                        unauthorized = e.is_unauthorized(),
                        error = %e,
                        "[SYNC][ERROR] Repository walk failed"
                    );
                    match on_error {
                        FailurePolicy::Abort => {
                            return Err(SyncError::Repository {
                                repository: repo.name,
                                source: e,
                            })
                        }
                        FailurePolicy::Continue => failed.push(FailedRepository {
                            name: repo.name,
                            error: e.to_string(),
                        }),
                    }
                }
            }
        }
    }

    let not_indexed = files_not_indexed(&repositories);
    let reconciliation = if !failed.is_empty() {
        warn!(
            failed = failed.len(),
            "[SYNC] Skipping reconciliation because some repositories failed"
        );
        None
    } else if not_indexed > 0 {
        warn!(
            files_not_indexed = not_indexed,
            "[SYNC] Skipping reconciliation because some files were not indexed"
        );
        None
    } else {
        let delay = config.run.settle_delay();
        info!(delay_secs = delay.as_secs(), "[SYNC] Waiting for the index to settle");
        tokio::time::sleep(delay).await;

        let window = WindowQuery::up_to(&config.target.collection, ctx.staging.run_timestamp_utc());
        let engine = ReconciliationEngine::new(index, &config.target);
        Some(engine.reconcile(&window).await)
    };

    let report = SynchroniseReport {
        staging_dir: ctx.staging.directory().to_path_buf(),
        repositories,
        failed,
        reconciliation,
        elapsed: started.elapsed(),
    };
    info!(
        repositories = ctx.staging.repositories_processed(),
        files_indexed = report.files_indexed(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "[SYNC] Finished processing"
    );
    Ok(report)
}
