//! Tracing setup for the binary: stdout plus two rolling log files in `log.dir`.
//!
//! - `operations.log.*` receives every event that passes the env filter.
//! - `error.log.*` receives `WARN` and above only.
//!
//! The filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::load_config::{LogConfig, LogRotation};

pub const DEFAULT_FILTER: &str = "repo_indexer=info,repo_indexer_core=info";
pub const OPERATIONS_LOG_PREFIX: &str = "operations";
pub const ERROR_LOG_PREFIX: &str = "error";

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

fn appender(config: &LogConfig, prefix: &str) -> Result<RollingFileAppender> {
    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(prefix)
        .filename_suffix("log");
    if config.max_files > 0 {
        builder = builder.max_log_files(config.max_files);
    }
    builder
        .build(&config.dir)
        .with_context(|| format!("creating {prefix} log in {}", config.dir.display()))
}

/// Install the global subscriber. Fails if the log directory cannot be written or a
/// subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("creating log directory {}", config.dir.display()))?;

    let operations = appender(config, OPERATIONS_LOG_PREFIX)?;
    let errors = appender(config, ERROR_LOG_PREFIX)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stdout))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(operations),
        )
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(errors)
                .with_filter(LevelFilter::WARN),
        )
        .try_init()
        .context("initialising tracing subscriber")?;
    Ok(())
}
