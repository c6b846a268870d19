use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Everything one crawl-and-reconcile run needs to know, already merged with secrets.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub hosting: HostingConfig,
    pub exclude: ExclusionConfig,
    pub target: IndexTarget,
    pub data_dir: PathBuf,
    pub run: RunConfig,
}

/// Which repositories to enumerate on the hosting API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostingConfig {
    /// API base, e.g. `https://api.github.com`. No trailing slash is expected.
    pub base_url: String,
    #[serde(default)]
    pub public_repos: bool,
    #[serde(default)]
    pub include_users: Vec<String>,
    #[serde(default)]
    pub include_orgs: Vec<String>,
}

/// Deny-lists for repository names, file names and file extensions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionConfig {
    #[serde(default)]
    pub repos: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    /// Extensions including the leading dot, e.g. `.md`.
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Collection and API key every index and delete request is addressed with.
#[derive(Clone)]
pub struct IndexTarget {
    pub collection: String,
    pub api_key: String,
}

impl std::fmt::Debug for IndexTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexTarget")
            .field("collection", &self.collection)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// What to do when one repository walk fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run on the first failed repository and skip reconciliation.
    #[default]
    Abort,
    /// Record the failure and carry on with the next repository.
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    #[serde(default = "default_probe_retries")]
    pub probe_retries: u32,
    #[serde(default = "default_probe_spacing_secs")]
    pub probe_spacing_secs: u64,
    #[serde(default)]
    pub on_repository_error: FailurePolicy,
}

fn default_settle_delay_secs() -> u64 {
    30
}

fn default_probe_retries() -> u32 {
    3
}

fn default_probe_spacing_secs() -> u64 {
    10
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: default_settle_delay_secs(),
            probe_retries: default_probe_retries(),
            probe_spacing_secs: default_probe_spacing_secs(),
            on_repository_error: FailurePolicy::default(),
        }
    }
}

impl RunConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn probe_spacing(&self) -> Duration {
        Duration::from_secs(self.probe_spacing_secs)
    }
}

impl CrawlConfig {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.hosting.base_url,
            public_repos = self.hosting.public_repos,
            users = self.hosting.include_users.len(),
            orgs = self.hosting.include_orgs.len(),
            collection = %self.target.collection,
            data_dir = %self.data_dir.display(),
            policy = ?self.run.on_repository_error,
            "Loaded CrawlConfig"
        );
        debug!(?self, "CrawlConfig loaded (full debug)");
    }
}
