//! Error types for repo-indexer-core.
//!
//! Only the failures that abort something are modelled here. Per-item problems (a malformed
//! listing, a failed local write, an index rejection, a failed delete) are logged where they
//! happen and counted in the run report instead.

use thiserror::Error;

/// Failure of a request against the repository-hosting API.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The hosting API answered 401. Fatal for the enclosing repository walk.
    #[error("unauthorized: {url}")]
    Unauthorized { url: String },

    /// Any answer other than 200 or 401, redirects included.
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request never produced a response, or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Unauthorized { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Unauthorized { url }
            | FetchError::Status { url, .. }
            | FetchError::Transport { url, .. } => url,
        }
    }
}

/// Failure talking to the index service's search endpoint.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("index service returned status {0}")]
    Status(u16),

    #[error("could not decode index query response: {0}")]
    Decode(String),
}

/// Reasons a synchronisation run stops early.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A repository listing (public feed, user or org) failed.
    #[error("listing repositories from {url} failed: {source}")]
    Listing {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A repository walk failed and the failure policy says abort.
    #[error("walking repository {repository} failed: {source}")]
    Repository {
        repository: String,
        #[source]
        source: FetchError,
    },

    /// The startup probe gave up.
    #[error("index service not reachable after {attempts} attempts")]
    IndexUnreachable { attempts: u32 },
}
