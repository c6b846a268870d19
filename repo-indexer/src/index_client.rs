//! # Index client integration (CLI <-> Core)
//!
//! Bridges the core [`IndexClient`] trait to the search index's HTTP API. The core crate only
//! knows outcomes; this module owns the wire format:
//!
//! - `POST {url}/add` with `{"apikey", "document": {colname, url, uid, title, location, meta}}`
//! - `POST {url}/delete` with `{"apikey", "document": {colname, url}}`
//! - `GET {servlet_url}?...` for the reconciliation window query
//! - `GET {service root}` as the reachability probe, where the root is `url` cut at its first
//!   `rest` segment
//!
//! The HTTP status of add/delete is handed to the core as the service's status code. A request
//! that never got an answer is reported as status `-1`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use repo_indexer_core::contract::{
    DeleteOutcome, DeleteRequest, IndexClient, IndexOutcome, IndexRequest, WindowQuery,
};
use repo_indexer_core::error::IndexError;

use crate::load_config::IndexEndpoints;

/// Status reported when the index service could not be reached at all.
pub const UNREACHABLE_STATUS: i32 = -1;

#[derive(Serialize)]
struct DeleteBody<'a> {
    apikey: &'a str,
    document: DeleteDocument<'a>,
}

#[derive(Serialize)]
struct DeleteDocument<'a> {
    colname: &'a str,
    url: &'a str,
}

pub struct SearchIndexClient {
    http: Client,
    endpoints: IndexEndpoints,
}

impl SearchIndexClient {
    pub fn new(endpoints: IndexEndpoints) -> Result<Self, reqwest::Error> {
        let http = Client::builder().build()?;
        info!(url = %endpoints.url, servlet_url = %endpoints.servlet_url, "Initialized SearchIndexClient");
        Ok(Self { http, endpoints })
    }

    /// `url` up to its first `rest`, e.g. `http://s:8080/` for `http://s:8080/rest/v1/api`.
    pub fn service_root(&self) -> &str {
        match self.endpoints.url.split_once("rest") {
            Some((root, _)) => root,
            None => &self.endpoints.url,
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{action}", self.endpoints.url.trim_end_matches('/'))
    }

    async fn post_status<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> i32 {
        match self.http.post(url).json(body).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                debug!(url, status, "Index service answered");
                status
            }
            Err(e) => {
                error!(url, error = %e, "Index service request failed");
                UNREACHABLE_STATUS
            }
        }
    }
}

#[async_trait]
impl IndexClient for SearchIndexClient {
    async fn ping(&self) -> bool {
        let root = self.service_root();
        match self.http.get(root).send().await {
            Ok(resp) => {
                debug!(url = root, status = resp.status().as_u16(), "Index service probe answered");
                true
            }
            Err(e) => {
                warn!(url = root, error = %e, "Index service probe failed");
                false
            }
        }
    }

    async fn index(&self, request: &IndexRequest) -> IndexOutcome {
        let url = self.endpoint("add");
        IndexOutcome::from_status(self.post_status(&url, request).await)
    }

    async fn delete(&self, request: &DeleteRequest) -> DeleteOutcome {
        let url = self.endpoint("delete");
        let body = DeleteBody {
            apikey: &request.api_key,
            document: DeleteDocument {
                colname: &request.collection,
                url: &request.url,
            },
        };
        DeleteOutcome::from_status(self.post_status(&url, &body).await)
    }

    async fn search(&self, query: &WindowQuery) -> Result<Vec<u8>, IndexError> {
        let url = query.url(&self.endpoints.servlet_url);
        debug!(url = %url, "Querying index window");
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            error!(url = %url, status = status.as_u16(), "Index window query rejected");
            return Err(IndexError::Status(status.as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
