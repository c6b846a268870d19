//! Startup reachability check for the index service.
//!
//! One initial attempt, then up to `max_retries` retries `spacing` apart. The failure counter
//! belongs to the probe value, so each run (or each test) starts from zero.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::contract::IndexClient;

#[derive(Debug, Clone)]
pub struct StartupProbe {
    max_retries: u32,
    spacing: Duration,
    failures: u32,
}

impl StartupProbe {
    pub fn new(max_retries: u32, spacing: Duration) -> Self {
        Self {
            max_retries,
            spacing,
            failures: 0,
        }
    }

    pub fn from_config(run: &RunConfig) -> Self {
        Self::new(run.probe_retries, run.probe_spacing())
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Total attempts made by the last call.
    pub fn attempts(&self) -> u32 {
        self.failures + 1
    }

    /// Block until the service answers or retries run out. Resets the counter on success.
    pub async fn wait_until_reachable<I: IndexClient + ?Sized>(&mut self, index: &I) -> bool {
        self.failures = 0;
        loop {
            if index.ping().await {
                info!(retries = self.failures, "Index service reachable");
                self.failures = 0;
                return true;
            }
            if self.failures >= self.max_retries {
                warn!(attempts = self.failures + 1, "Index service not reachable, giving up");
                return false;
            }
            self.failures += 1;
            warn!(
                attempt = self.failures,
                wait_secs = self.spacing.as_secs(),
                "Index service not reachable, retrying"
            );
            tokio::time::sleep(self.spacing).await;
        }
    }
}
