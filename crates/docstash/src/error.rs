//! Error types for docstash

use thiserror::Error;

/// Errors that can occur during stash operations
#[derive(Debug, Error)]
pub enum StashError {
    /// Referenced package name is absent from the manifest
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Both the single-file probe and the crawl produced nothing
    #[error("Acquisition failed for {url}: {reason}")]
    AcquisitionFailed {
        /// URL acquisition was attempted for
        url: String,
        /// Human-readable failure reason
        reason: String,
    },

    /// Manifest could not be written
    #[error("Failed to persist manifest at {path}")]
    ManifestWrite {
        /// Manifest file path
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StashError {
    /// Classify a reqwest error into a stash error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StashError::Timeout
        } else if err.is_connect() {
            StashError::ConnectError(err)
        } else {
            StashError::RequestError(err.to_string())
        }
    }
}
