//! # fetch: reqwest implementation of [`ContentFetcher`]
//!
//! Every request carries the configured basic-auth credentials. Listing calls also send the
//! v3 `Accept` header and never follow redirects: a 3xx is the final answer and, not being a
//! 200, is classified as a failure. Downloads use a client with the default redirect policy
//! since raw file hosts routinely redirect.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{redirect, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::contract::{ContentFetcher, RepositoryDescriptor, TreeNode};
use crate::error::FetchError;

pub const GITHUB_V3_ACCEPT: &str = "application/vnd.github.v3+json";

/// Basic-auth pair for the hosting API.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct HttpFetcher {
    listing: Client,
    download: Client,
    credentials: Credentials,
}

impl HttpFetcher {
    pub fn new(credentials: Credentials) -> Result<Self, reqwest::Error> {
        let listing = Client::builder().redirect(redirect::Policy::none()).build()?;
        let download = Client::builder().build()?;
        info!(username = %credentials.username, "Initialized HttpFetcher");
        Ok(Self {
            listing,
            download,
            credentials,
        })
    }

    async fn get_listing(&self, url: &str) -> Result<Response, FetchError> {
        debug!(url, "GET listing");
        let resp = self
            .listing
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(ACCEPT, GITHUB_V3_ACCEPT)
            .send()
            .await
            .map_err(|source| transport(url, source))?;
        classify(url, resp)
    }

    /// Fetch a listing and decode it; an undecodable body is logged and read as empty.
    async fn list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, FetchError> {
        let resp = self.get_listing(url).await?;
        let body = resp.bytes().await.map_err(|source| transport(url, source))?;
        match serde_json::from_slice::<Vec<T>>(&body) {
            Ok(items) => {
                debug!(url, count = items.len(), "Listing decoded");
                Ok(items)
            }
            Err(e) => {
                error!(url, error = %e, "Malformed listing payload, treating as empty");
                Ok(Vec::new())
            }
        }
    }
}

fn transport(url: &str, source: reqwest::Error) -> FetchError {
    error!(url, error = %source, "Request to hosting API failed");
    FetchError::Transport {
        url: url.to_owned(),
        source,
    }
}

/// Only a 200 passes. A 401 is told apart because it is fatal for the whole repository.
fn classify(url: &str, resp: Response) -> Result<Response, FetchError> {
    match resp.status() {
        StatusCode::OK => Ok(resp),
        StatusCode::UNAUTHORIZED => {
            error!(url, "Hosting API answered 401 Unauthorized");
            Err(FetchError::Unauthorized {
                url: url.to_owned(),
            })
        }
        status => {
            error!(url, status = status.as_u16(), "Hosting API answered with unexpected status");
            Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn list_repositories(&self, url: &str) -> Result<Vec<RepositoryDescriptor>, FetchError> {
        self.list(url).await
    }

    async fn list_repository_contents(&self, endpoint: &str) -> Result<Vec<TreeNode>, FetchError> {
        let root = endpoint.strip_suffix("/{+path}").unwrap_or(endpoint);
        self.list(root).await
    }

    async fn list_directory(&self, url: &str) -> Result<Vec<TreeNode>, FetchError> {
        self.list(url).await
    }

    async fn download_file(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        debug!(url = locator, "GET file");
        let resp = self
            .download
            .get(locator)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|source| transport(locator, source))?;
        let resp = classify(locator, resp)?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| transport(locator, source))?;
        Ok(bytes.to_vec())
    }
}
