/// `load_config` module: Loads a static YAML config and injects secrets from the environment,
/// producing the [`AppConfig`] the CLI runs with.
///
/// This module is the only place where untrusted YAML is parsed and mapped to the strongly
/// typed structs of `repo-indexer-core`.
///
/// # Responsibilities
/// - Parse the YAML sections (`hosting`, `exclude`, `index`, `staging`, `log`, `run`)
/// - Read `HOSTING_USERNAME`, `HOSTING_PASSWORD` and `INDEX_API_KEY` from the environment
/// - Normalise values the core compares against (extensions are lower-cased)
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, Result};
use repo_indexer_core::config::{CrawlConfig, ExclusionConfig, HostingConfig, IndexTarget, RunConfig};
use repo_indexer_core::fetch::Credentials;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const ENV_HOSTING_USERNAME: &str = "HOSTING_USERNAME";
pub const ENV_HOSTING_PASSWORD: &str = "HOSTING_PASSWORD";
pub const ENV_INDEX_API_KEY: &str = "INDEX_API_KEY";

/// Everything the CLI needs for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub crawl: CrawlConfig,
    pub credentials: Credentials,
    pub index: IndexEndpoints,
    pub log: LogConfig,
}

/// Where the index service lives.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexEndpoints {
    /// REST base for add/delete, e.g. `http://search:8080/rest/v1/api`.
    pub url: String,
    /// Search servlet used for the reconciliation query.
    pub servlet_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub rotation: LogRotation,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_max_files() -> usize {
    7
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            rotation: LogRotation::default(),
            max_files: default_max_files(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexSection {
    url: String,
    servlet_url: String,
    collection: String,
}

#[derive(Debug, Deserialize)]
struct StagingSection {
    data_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    hosting: HostingConfig,
    #[serde(default)]
    exclude: ExclusionConfig,
    index: IndexSection,
    staging: StagingSection,
    #[serde(default)]
    log: LogConfig,
    #[serde(default)]
    run: RunConfig,
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).map_err(|e| {
        error!(variable = name, error = ?e, "Required environment variable missing");
        anyhow!("environment variable {name} must be set: {e}")
    })
}

/// Loads a static YAML config file (no secrets) and injects required env vars for secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let raw: RawConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let credentials = Credentials {
        username: require_env(ENV_HOSTING_USERNAME)?,
        password: require_env(ENV_HOSTING_PASSWORD)?,
    };
    let api_key = require_env(ENV_INDEX_API_KEY)?;

    let mut exclude = raw.exclude;
    exclude.extensions = exclude
        .extensions
        .into_iter()
        .map(|ext| ext.to_lowercase())
        .collect();

    let hosting = HostingConfig {
        base_url: raw.hosting.base_url.trim_end_matches('/').to_owned(),
        ..raw.hosting
    };
    if hosting.base_url.is_empty() {
        return Err(anyhow!("hosting.base_url must not be empty"));
    }

    let crawl = CrawlConfig {
        hosting,
        exclude,
        target: IndexTarget {
            collection: raw.index.collection,
            api_key,
        },
        data_dir: raw.staging.data_dir,
        run: raw.run,
    };
    crawl.trace_loaded();

    Ok(AppConfig {
        crawl,
        credentials,
        index: IndexEndpoints {
            url: raw.index.url,
            servlet_url: raw.index.servlet_url,
        },
        log: raw.log,
    })
}

/// Loads `.env` from the working directory if present. Never fails.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded environment from .env"),
        Err(e) if e.not_found() => {}
        Err(e) => error!(error = %e, "Failed to load .env file"),
    }
}

