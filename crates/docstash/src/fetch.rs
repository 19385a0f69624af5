//! HTTP fetching
//!
//! The [`Fetcher`] trait is the capability seam for retrieval: the crawler
//! and the single-file probe only ever talk to a `dyn Fetcher`, so tests can
//! point them at a mock server or a canned implementation.

use crate::error::StashError;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;

/// Connect timeout for all requests
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Binary content type prefixes; pages with these are skipped during a crawl
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "font/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
];

/// Check if a content type indicates binary content
pub fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// One retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Response body as text
    pub body: String,
}

impl FetchedPage {
    /// True for 2xx status codes
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the response body looks like binary content
    pub fn is_binary(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(is_binary_content_type)
    }
}

/// Capability interface for URL retrieval
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Retrieve one URL
    ///
    /// Non-2xx responses are returned as pages, not errors; only transport
    /// failures (connect, timeout) produce an `Err`.
    async fn get(&self, url: &str) -> Result<FetchedPage, StashError>;
}

/// Fetcher backed by a reqwest client
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeouts
    pub fn new() -> Result<Self, StashError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Create a fetcher with a custom total request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, StashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(DEFAULT_USER_AGENT),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html, text/markdown, text/plain, */*;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(StashError::ClientBuildError)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get(&self, url: &str) -> Result<FetchedPage, StashError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(StashError::InvalidUrlScheme);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(StashError::from_reqwest)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.map_err(StashError::from_reqwest)?;

        tracing::debug!(url = %final_url, status, "Fetched page");

        Ok(FetchedPage {
            url: final_url,
            status,
            content_type,
            body,
        })
    }
}
