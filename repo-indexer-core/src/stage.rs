//! Per-run staging directory: `{data_dir}/static{YYYY-MM-DD-HH-MM-SS}`.
//!
//! Files are written flat into the directory under their source filename, so two files with
//! the same name in one run overwrite each other. The directory is never removed by the
//! pipeline itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use tracing::{debug, error, info};

use crate::contract::StagedDocument;

const DIRECTORY_PREFIX: &str = "static";
const DIRECTORY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Clone)]
pub struct StagingRun {
    run_timestamp: DateTime<Local>,
    directory: PathBuf,
    repositories_processed: usize,
}

impl StagingRun {
    pub fn new(data_dir: &Path, run_timestamp: DateTime<Local>) -> Self {
        let directory = data_dir.join(Self::directory_name(&run_timestamp));
        Self {
            run_timestamp,
            directory,
            repositories_processed: 0,
        }
    }

    pub fn directory_name(run_timestamp: &DateTime<Local>) -> String {
        format!(
            "{DIRECTORY_PREFIX}{}",
            run_timestamp.format(DIRECTORY_TIMESTAMP_FORMAT)
        )
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn run_timestamp(&self) -> DateTime<Local> {
        self.run_timestamp
    }

    pub fn run_timestamp_utc(&self) -> DateTime<Utc> {
        self.run_timestamp.with_timezone(&Utc)
    }

    pub fn repositories_processed(&self) -> usize {
        self.repositories_processed
    }

    pub fn record_repository(&mut self) {
        self.repositories_processed += 1;
    }

    /// Create the directory. Best effort: a failure is logged and the run goes on.
    pub fn prepare(&self) -> bool {
        match fs::create_dir_all(&self.directory) {
            Ok(()) => {
                info!(path = %self.directory.display(), "Created staging directory");
                true
            }
            Err(e) => {
                error!(error = ?e, path = %self.directory.display(), "Failed to create staging directory");
                false
            }
        }
    }

    /// Write `bytes` to `{directory}/{filename}` and describe the result.
    ///
    /// `filename` comes from a remote listing and must be a single plain path component;
    /// anything else is rejected with [`io::ErrorKind::InvalidInput`].
    pub fn stage(
        &self,
        filename: &str,
        source_url: &str,
        bytes: &[u8],
    ) -> io::Result<StagedDocument> {
        if !is_plain_filename(filename) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to stage {filename:?} outside the staging directory"),
            ));
        }
        let path = self.directory.join(filename);
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), size = bytes.len(), "Staged file");
        Ok(StagedDocument::new(
            filename,
            path,
            source_url,
            bytes.len() as u64,
        ))
    }

    /// Remove the directory and everything in it. Not called by the pipeline.
    pub fn cleanup(&self) {
        if let Err(e) = fs::remove_dir_all(&self.directory) {
            error!(error = ?e, path = %self.directory.display(), "Failed to clear staging directory");
        }
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !Path::new(name).is_absolute()
}
