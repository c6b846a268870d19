//! # reconcile: delete index entries whose source was not refreshed by this run
//!
//! The index is queried for every entry of the collection whose index date lies between a
//! fixed early sentinel and the run's start. Everything re-indexed during the run has a later
//! index date, so what comes back is what vanished from the source; each entry is deleted.
//!
//! Only the first page (up to 1000 entries) is requested.
//!
//! The query response comes in two shapes that only differ in whether `results.result` is an
//! array or a single object. [`decode_query_response`] tries the array shape first and falls
//! back to the single shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, error, info, warn};

use crate::config::IndexTarget;
use crate::contract::{DeleteOutcome, DeleteRequest, IndexClient, WindowQuery};
use crate::error::IndexError;

pub const WINDOW_START: &str = "1970-01-10T00:00:00";
pub const QUERY_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const FIRST_PAGE: u32 = 1;
pub const PAGE_SIZE: u32 = 1000;

impl WindowQuery {
    /// Window from [`WINDOW_START`] to `end`.
    pub fn up_to(collection: &str, end: DateTime<Utc>) -> Self {
        Self {
            collection: collection.to_owned(),
            from: WINDOW_START.to_owned(),
            to: end.format(QUERY_TIMESTAMP_FORMAT).to_string(),
            page: FIRST_PAGE,
            page_size: PAGE_SIZE,
        }
    }

    /// `{from}TO{to}`, the facet range syntax of the search servlet.
    pub fn range(&self) -> String {
        format!("{}TO{}", self.from, self.to)
    }

    /// Full search URL against `servlet_url`, newest index date first.
    pub fn url(&self, servlet_url: &str) -> String {
        let range = self.range();
        format!(
            "{servlet_url}?facet=on&sort=indexdate&sortdir=des&cname={}&query=*&facet.field=indexdate&f.indexdate.range=[{range}]&f.indexdate.filter=[{range}]&page={}&pagesize={}&xsl=json",
            self.collection, self.page, self.page_size
        )
    }
}

/// One entry as reported by the search servlet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IndexEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub uid: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(rename = "lastmodified", default, deserialize_with = "null_as_empty")]
    pub last_indexed: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
}

/// The servlet sends `null` for fields it has no value for.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    Multiple(Vec<IndexEntry>),
    Single(IndexEntry),
}

impl QueryResponse {
    pub fn into_entries(self) -> Vec<IndexEntry> {
        match self {
            QueryResponse::Multiple(entries) => entries,
            QueryResponse::Single(entry) => vec![entry],
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    results: Option<Results<T>>,
}

#[derive(Deserialize)]
struct Results<T> {
    result: Option<T>,
}

/// Array shape first, single-object shape second.
pub fn decode_query_response(body: &[u8]) -> Result<QueryResponse, IndexError> {
    let multi_err = match serde_json::from_slice::<Envelope<Vec<IndexEntry>>>(body) {
        Ok(envelope) => {
            let entries = envelope
                .results
                .and_then(|r| r.result)
                .unwrap_or_default();
            return Ok(QueryResponse::Multiple(entries));
        }
        Err(e) => e,
    };
    debug!(error = %multi_err, "Query response is not the multi-result shape, trying single");
    match serde_json::from_slice::<Envelope<IndexEntry>>(body) {
        Ok(envelope) => Ok(QueryResponse::Single(
            envelope
                .results
                .and_then(|r| r.result)
                .unwrap_or_default(),
        )),
        Err(single_err) => Err(IndexError::Decode(format!(
            "neither multi-result ({multi_err}) nor single-result ({single_err}) shape"
        ))),
    }
}

/// Removes every occurrence of the literal substring `amp`.
///
/// Not an HTML or URL unescape: entries already in the index were stored under URLs
/// rewritten exactly this way, so `f&amp;oo` becomes `f&;oo`. One left-to-right pass, the
/// same rewrite those URLs went through; an `amp` formed by joining the two halves
/// (`aampmp` to `amp`) is left in place.
pub fn normalize_url(url: &str) -> String {
    url.replace("amp", "")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub candidates: usize,
    pub deleted: usize,
    pub not_deleted: usize,
    pub skipped: usize,
    /// The query itself failed or could not be decoded; nothing was deleted.
    pub query_failed: bool,
}

pub struct ReconciliationEngine<'a, I> {
    index: &'a I,
    target: &'a IndexTarget,
}

impl<'a, I: IndexClient> ReconciliationEngine<'a, I> {
    pub fn new(index: &'a I, target: &'a IndexTarget) -> Self {
        Self { index, target }
    }

    /// Query the window and delete every returned entry. Deletes are independent: one
    /// failing does not stop the others.
    pub async fn reconcile(&self, window: &WindowQuery) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        info!(collection = %window.collection, range = %window.range(), "Starting reconciliation");

        let body = match self.index.search(window).await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Index window query failed");
                report.query_failed = true;
                return report;
            }
        };
        debug!(response = %String::from_utf8_lossy(&body), "Index window query response");

        let entries = match decode_query_response(&body) {
            Ok(response) => response.into_entries(),
            Err(e) => {
                error!(error = %e, "Index window query response could not be decoded");
                report.query_failed = true;
                return report;
            }
        };
        report.candidates = entries.len();

        for entry in entries {
            if entry.url.is_empty() {
                warn!(uid = %entry.uid, title = %entry.title, "Index entry has no URL, skipping");
                report.skipped += 1;
                continue;
            }
            let request = DeleteRequest {
                api_key: self.target.api_key.clone(),
                collection: self.target.collection.clone(),
                url: normalize_url(&entry.url),
            };
            debug!(url = %request.url, "Deleting stale index entry");
            match self.index.delete(&request).await {
                DeleteOutcome::Deleted => {
                    info!(title = %entry.title, url = %request.url, "Deleted document");
                    report.deleted += 1;
                }
                DeleteOutcome::NotDeleted { status } => {
                    warn!(title = %entry.title, url = %request.url, status, "Document could not be deleted");
                    report.not_deleted += 1;
                }
            }
        }

        info!(
            candidates = report.candidates,
            deleted = report.deleted,
            not_deleted = report.not_deleted,
            "Reconciliation finished"
        );
        report
    }
}
