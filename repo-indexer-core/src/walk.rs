//! # walk: depth-first traversal of one repository's contents
//!
//! The traversal runs over an explicit stack of pending nodes instead of native recursion, so
//! tree depth costs heap, not call stack. Children are pushed in reverse so they are visited
//! in listing order.
//!
//! Directory URLs are built by string concatenation, which is how the hosting API expects to
//! be addressed: a top-level directory is `{contents root}/{path}`, anything deeper is
//! `{parent url}/{name}`.
//!
//! Failure semantics:
//! - any [`FetchError`] (401, other status, transport) aborts the walk at once and is returned;
//!   no sibling or descendant is fetched afterwards;
//! - a failed local write skips that file's index submission only;
//! - an index rejection (`-1`, `601`, `501` or any other non-2xx status) is logged and counted
//!   for that file only.

use tracing::{debug, error, info, warn};

use crate::config::IndexTarget;
use crate::contract::{ContentFetcher, IndexClient, IndexOutcome, IndexRequest, RepositoryDescriptor, TreeNode};
use crate::error::FetchError;
use crate::filter::{extension_of, FilterPolicy};
use crate::stage::StagingRun;

/// Counters for one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub directories_listed: usize,
    pub files_seen: usize,
    pub files_excluded: usize,
    pub files_staged: usize,
    pub files_indexed: usize,
    pub index_rejections: usize,
    pub write_failures: usize,
    pub files_without_locator: usize,
}

impl WalkStats {
    /// Files that were kept by the filters but did not reach the index.
    pub fn files_not_indexed(&self) -> usize {
        self.write_failures + self.index_rejections
    }
}

enum Pending {
    Directory { url: String },
    File(TreeNode),
}

pub struct TreeWalker<'a, F, I> {
    fetcher: &'a F,
    index: &'a I,
    policy: &'a FilterPolicy,
    target: &'a IndexTarget,
}

impl<'a, F, I> TreeWalker<'a, F, I>
where
    F: ContentFetcher,
    I: IndexClient,
{
    pub fn new(fetcher: &'a F, index: &'a I, policy: &'a FilterPolicy, target: &'a IndexTarget) -> Self {
        Self {
            fetcher,
            index,
            policy,
            target,
        }
    }

    /// Walk a repository from its contents endpoint.
    pub async fn walk_repository(
        &self,
        repo: &RepositoryDescriptor,
        staging: &StagingRun,
    ) -> Result<WalkStats, FetchError> {
        let root = repo.contents_root();
        info!(repository = %repo.name, root, "Walking repository");
        let nodes = self
            .fetcher
            .list_repository_contents(&repo.contents_endpoint_template)
            .await?;

        let mut stats = WalkStats {
            directories_listed: 1,
            ..WalkStats::default()
        };
        let mut stack = Vec::new();
        push_children(&mut stack, root, nodes, Segment::Path);
        self.drain(stack, staging, &mut stats).await?;

        info!(
            repository = %repo.name,
            files_seen = stats.files_seen,
            files_indexed = stats.files_indexed,
            files_excluded = stats.files_excluded,
            "Finished walking repository"
        );
        Ok(stats)
    }

    /// Walk everything below the directory at `url`.
    pub async fn walk(&self, url: &str, staging: &StagingRun) -> Result<WalkStats, FetchError> {
        let mut stats = WalkStats::default();
        let stack = vec![Pending::Directory {
            url: url.to_owned(),
        }];
        self.drain(stack, staging, &mut stats).await?;
        Ok(stats)
    }

    async fn drain(
        &self,
        mut stack: Vec<Pending>,
        staging: &StagingRun,
        stats: &mut WalkStats,
    ) -> Result<(), FetchError> {
        while let Some(next) = stack.pop() {
            match next {
                Pending::Directory { url } => {
                    debug!(url = %url, "Listing directory");
                    let nodes = self.fetcher.list_directory(&url).await?;
                    stats.directories_listed += 1;
                    push_children(&mut stack, &url, nodes, Segment::Name);
                }
                Pending::File(node) => self.visit_file(node, staging, stats).await?,
            }
        }
        Ok(())
    }

    async fn visit_file(
        &self,
        node: TreeNode,
        staging: &StagingRun,
        stats: &mut WalkStats,
    ) -> Result<(), FetchError> {
        stats.files_seen += 1;
        if self.policy.excludes_filename(&node.name) {
            debug!(file = %node.name, "File excluded by name");
            stats.files_excluded += 1;
            return Ok(());
        }
        if self.policy.excludes_extension(&extension_of(&node.name)) {
            debug!(file = %node.name, "File excluded by extension");
            stats.files_excluded += 1;
            return Ok(());
        }
        let Some(locator) = node.download_locator.as_deref() else {
            warn!(file = %node.name, path = %node.path, "File has no download URL, skipping");
            stats.files_without_locator += 1;
            return Ok(());
        };

        let bytes = self.fetcher.download_file(locator).await?;

        let staged = match staging.stage(&node.name, locator, &bytes) {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = ?e, file = %node.name, dir = %staging.directory().display(), "Failed to write staged file");
                stats.write_failures += 1;
                return Ok(());
            }
        };
        stats.files_staged += 1;

        let request = IndexRequest::for_document(self.target, &staged);
        debug!(
            url = %request.document.url,
            title = %request.document.title,
            "Submitting document for indexing"
        );
        match self.index.index(&request).await {
            IndexOutcome::Indexed { status } => {
                debug!(url = %staged.source_url, status, "Document submitted");
                stats.files_indexed += 1;
            }
            IndexOutcome::Unreachable => {
                error!(url = %staged.source_url, "Index service is not connecting");
                stats.index_rejections += 1;
            }
            IndexOutcome::InvalidApiKey => {
                error!(url = %staged.source_url, "Index API key is not valid");
                stats.index_rejections += 1;
            }
            IndexOutcome::UnknownCollection => {
                error!(
                    url = %staged.source_url,
                    collection = %self.target.collection,
                    "Index collection is not present"
                );
                stats.index_rejections += 1;
            }
            IndexOutcome::Rejected { status } => {
                error!(url = %staged.source_url, status, "Index service rejected the document");
                stats.index_rejections += 1;
            }
        }
        Ok(())
    }
}

/// Which part of a directory node is appended to its parent's URL.
#[derive(Clone, Copy)]
enum Segment {
    Path,
    Name,
}

fn push_children(stack: &mut Vec<Pending>, parent_url: &str, nodes: Vec<TreeNode>, segment: Segment) {
    for node in nodes.into_iter().rev() {
        if node.is_file() {
            stack.push(Pending::File(node));
        } else {
            let url = match segment {
                Segment::Path => child_url(parent_url, &node.path),
                Segment::Name => child_url(parent_url, &node.name),
            };
            stack.push(Pending::Directory { url });
        }
    }
}

pub fn child_url(parent_url: &str, segment: &str) -> String {
    format!("{parent_url}/{segment}")
}
