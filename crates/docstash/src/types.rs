//! Core types for docstash

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a package's documentation was acquired
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionMethod {
    /// One pre-aggregated document fetched from the site's llms.txt endpoint
    #[default]
    SingleFile,
    /// Recursive same-origin page retrieval followed by per-page conversion
    Crawl,
}

impl FromStr for AcquisitionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single-file" => Ok(AcquisitionMethod::SingleFile),
            "crawl" => Ok(AcquisitionMethod::Crawl),
            _ => Err("Invalid method: must be single-file or crawl".to_string()),
        }
    }
}

impl std::fmt::Display for AcquisitionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionMethod::SingleFile => write!(f, "single-file"),
            AcquisitionMethod::Crawl => write!(f, "crawl"),
        }
    }
}

/// One markdown document belonging to a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Relative path under the package's markdown root; unique within a package
    pub path: String,

    /// Best-effort title from the document's first heading line, empty if absent
    #[serde(default)]
    pub title: String,

    /// Provenance URL this document was fetched from (or derived for crawled pages)
    pub url: String,

    /// Path to the markdown content on disk, relative to the stash root
    pub file: String,
}

impl FileRecord {
    /// Create a new file record
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            url: url.into(),
            file: file.into(),
        }
    }
}

/// One archived documentation set, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Unique package name
    pub name: String,

    /// Origin URL, normalized (trailing slash stripped)
    pub url: String,

    /// Which acquisition path populated this package
    pub method: AcquisitionMethod,

    /// Number of recorded files
    pub file_count: usize,

    /// File records in lexicographic path order
    pub files: Vec<FileRecord>,
}

impl Package {
    /// Create a package, sorting files by path and setting the count
    ///
    /// The source URL is normalized by stripping any trailing slash.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        method: AcquisitionMethod,
        mut files: Vec<FileRecord>,
    ) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let file_count = files.len();
        Self {
            name: name.into(),
            url: normalize_url(&url.into()),
            method,
            file_count,
            files,
        }
    }
}

/// Strip the trailing slash from a URL, if any
pub fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
