//! # contract: trait seams and plain data shared by the crawl and reconcile pipeline
//!
//! Two traits separate the pipeline from the outside world:
//! - [`ContentFetcher`]: listing and downloading against the repository-hosting API.
//! - [`IndexClient`]: submitting, deleting and querying documents in the search index.
//!
//! Both are annotated for `mockall`, exported under the default `test-export-mocks` feature so
//! integration tests in this and dependent crates can script them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::config::IndexTarget;
use crate::error::{FetchError, IndexError};

/// One repository as returned by a repository listing call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    /// URI template of the contents endpoint, e.g. `https://api/repos/o/r/contents/{+path}`.
    #[serde(rename = "contents_url")]
    pub contents_endpoint_template: String,
}

impl RepositoryDescriptor {
    /// The contents endpoint with the `/{+path}` template suffix removed.
    pub fn contents_root(&self) -> &str {
        self.contents_endpoint_template
            .strip_suffix("/{+path}")
            .unwrap_or(&self.contents_endpoint_template)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NodeKind {
    File,
    /// Anything the hosting API does not call `file` is expanded as a directory.
    Directory,
}

impl From<String> for NodeKind {
    fn from(kind: String) -> Self {
        if kind == "file" {
            NodeKind::File
        } else {
            NodeKind::Directory
        }
    }
}

/// One entry of a contents listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Raw download URL, only present for files.
    #[serde(rename = "download_url", default)]
    pub download_locator: Option<String>,
    /// API URL describing this entry.
    #[serde(rename = "url", default)]
    pub metadata_locator: Option<String>,
}

impl TreeNode {
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// A file written to the run's staging directory, ready for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedDocument {
    pub source_filename: String,
    pub local_path: PathBuf,
    pub source_url: String,
    /// Always equal to `source_url`; the identity shared by source and index.
    pub unique_id: String,
    pub size_bytes: u64,
    pub title: String,
}

impl StagedDocument {
    pub fn new(source_filename: &str, local_path: PathBuf, source_url: &str, size_bytes: u64) -> Self {
        Self {
            source_filename: source_filename.to_owned(),
            local_path,
            source_url: source_url.to_owned(),
            unique_id: source_url.to_owned(),
            size_bytes,
            title: source_filename.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
    #[serde(rename = "colname")]
    pub collection: String,
    pub url: String,
    pub uid: String,
    pub title: String,
    pub location: String,
    pub meta: BTreeMap<String, String>,
}

/// Request to index one staged document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRequest {
    #[serde(rename = "apikey")]
    pub api_key: String,
    pub document: IndexDocument,
}

impl IndexRequest {
    pub fn for_document(target: &IndexTarget, doc: &StagedDocument) -> Self {
        let mut meta = BTreeMap::new();
        meta.insert("size".to_owned(), doc.size_bytes.to_string());
        meta.insert("name".to_owned(), doc.source_filename.clone());
        Self {
            api_key: target.api_key.clone(),
            document: IndexDocument {
                collection: target.collection.clone(),
                url: doc.source_url.clone(),
                uid: doc.unique_id.clone(),
                title: doc.title.clone(),
                location: doc.local_path.display().to_string(),
                meta,
            },
        }
    }
}

/// Request to delete the index entry stored under `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteRequest {
    #[serde(rename = "apikey")]
    pub api_key: String,
    #[serde(rename = "colname")]
    pub collection: String,
    pub url: String,
}

/// Outcome of an index submission, translated from the service's status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Any 2xx status.
    Indexed { status: i32 },
    /// Status `-1`: the service could not be reached.
    Unreachable,
    /// Status `601`.
    InvalidApiKey,
    /// Status `501`.
    UnknownCollection,
    /// Any other non-2xx status.
    Rejected { status: i32 },
}

impl IndexOutcome {
    pub fn from_status(status: i32) -> Self {
        match status {
            -1 => IndexOutcome::Unreachable,
            601 => IndexOutcome::InvalidApiKey,
            501 => IndexOutcome::UnknownCollection,
            200..=299 => IndexOutcome::Indexed { status },
            status => IndexOutcome::Rejected { status },
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, IndexOutcome::Indexed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotDeleted { status: i32 },
}

impl DeleteOutcome {
    pub fn from_status(status: i32) -> Self {
        if status == 200 {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotDeleted { status }
        }
    }
}

/// A time-ranged query over the index date facet of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowQuery {
    pub collection: String,
    /// `YYYY-MM-DDTHH:MM:SS`
    pub from: String,
    /// `YYYY-MM-DDTHH:MM:SS`
    pub to: String,
    pub page: u32,
    pub page_size: u32,
}

/// Listing and downloading against the repository-hosting API.
///
/// Listing calls classify a 401 as [`FetchError::Unauthorized`], any other non-200 answer as
/// [`FetchError::Status`]. A listing body that does not decode is treated as empty.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// List the repositories behind a `/repositories`, `/users/{u}/repos` or `/orgs/{o}/repos` URL.
    async fn list_repositories(&self, url: &str) -> Result<Vec<RepositoryDescriptor>, FetchError>;

    /// List the top level of a repository given its contents endpoint (template suffix allowed).
    async fn list_repository_contents(&self, endpoint: &str) -> Result<Vec<TreeNode>, FetchError>;

    /// List one directory by its contents URL.
    async fn list_directory(&self, url: &str) -> Result<Vec<TreeNode>, FetchError>;

    /// Download the raw bytes behind a file's download locator.
    async fn download_file(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

/// Submitting, deleting and querying documents in the search index.
///
/// The implementor owns the wire format and translates status codes into
/// [`IndexOutcome`] / [`DeleteOutcome`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Whether the index service answers at all.
    async fn ping(&self) -> bool;

    async fn index(&self, request: &IndexRequest) -> IndexOutcome;

    async fn delete(&self, request: &DeleteRequest) -> DeleteOutcome;

    /// Run a window query and hand back the raw response body.
    async fn search(&self, query: &WindowQuery) -> Result<Vec<u8>, IndexError>;
}
