//! Keyword search over a package's file records
//!
//! Three match tiers in fixed priority order: path, then title, then the
//! first 500 characters of content. Tiers are concatenated without
//! cross-tier re-ranking; within a tier the package's file order holds.

use crate::error::StashError;
use crate::manifest::ManifestStore;
use crate::types::FileRecord;
use std::fs;
use std::path::Path;
use tracing::debug;

/// How many characters of content the content tier inspects
///
/// Biases matching toward document introductions and keeps navigation and
/// footer boilerplate deep in crawled pages from producing false positives.
pub const CONTENT_SCAN_CHARS: usize = 500;

/// Find files in a package matching a keyword
///
/// Case-insensitive substring match. An empty keyword matches every file.
/// Unknown package names are a distinct error from an empty result.
pub fn find(
    store: &ManifestStore,
    package_name: &str,
    keyword: &str,
) -> Result<Vec<FileRecord>, StashError> {
    let package = store
        .package(package_name)
        .ok_or_else(|| StashError::PackageNotFound(package_name.to_string()))?;

    let needle = keyword.to_lowercase();
    let mut path_matches = Vec::new();
    let mut title_matches = Vec::new();
    let mut content_matches = Vec::new();

    for file in &package.files {
        if file.path.to_lowercase().contains(&needle) {
            path_matches.push(file.clone());
        } else if file.title.to_lowercase().contains(&needle) {
            title_matches.push(file.clone());
        } else if content_head(store.root(), file).to_lowercase().contains(&needle) {
            content_matches.push(file.clone());
        }
    }

    debug!(
        package = package_name,
        keyword,
        path = path_matches.len(),
        title = title_matches.len(),
        content = content_matches.len(),
        "Query complete"
    );

    path_matches.extend(title_matches);
    path_matches.extend(content_matches);
    Ok(path_matches)
}

/// Read a file's content for the top match of a query
pub fn read_content(store: &ManifestStore, file: &FileRecord) -> Result<String, StashError> {
    Ok(fs::read_to_string(store.root().join(&file.file))?)
}

/// First [`CONTENT_SCAN_CHARS`] characters of a file, empty when unreadable
fn content_head(root: &Path, file: &FileRecord) -> String {
    match fs::read_to_string(root.join(&file.file)) {
        Ok(text) => text.chars().take(CONTENT_SCAN_CHARS).collect(),
        Err(_) => String::new(),
    }
}
