//! Package acquisition
//!
//! Tries the single-file `llms.txt` export first; when the probe fails,
//! falls back to a bounded same-origin crawl with per-page markdown
//! conversion. Pages are fetched strictly one at a time.

use crate::convert::{extract_links, is_html, Converter};
use crate::error::StashError;
use crate::fetch::Fetcher;
use crate::manifest::ManifestStore;
use crate::types::AcquisitionMethod;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

/// Well-known path probed for a pre-aggregated docs export
pub const SINGLE_FILE_PROBE_PATH: &str = "/llms.txt";

/// Maximum link depth followed from the start URL
pub const MAX_CRAWL_DEPTH: usize = 5;

/// Maximum number of pages fetched in one crawl
pub const MAX_CRAWL_PAGES: usize = 200;

/// File name used for a single-file package's lone document
const SINGLE_FILE_DOC: &str = "llms.md";

/// Result of processing one crawled page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Page converted and written; holds the relative markdown path
    Saved(String),
    /// Page fetched but not kept
    Skipped {
        /// Page URL
        url: String,
        /// Why the page was dropped
        reason: String,
    },
}

/// Summary of a completed acquisition
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Which path populated the package
    pub method: AcquisitionMethod,
    /// Number of markdown documents written
    pub pages_saved: usize,
    /// Number of pages fetched but dropped
    pub pages_skipped: usize,
}

/// Download a package and rebuild its manifest entry
///
/// Any existing on-disk tree and manifest entry for `name` are fully
/// replaced. The manifest is saved before returning.
pub async fn download(
    store: &mut ManifestStore,
    name: &str,
    url: &str,
    fetcher: &dyn Fetcher,
    converter: &dyn Converter,
) -> Result<Acquisition, StashError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(StashError::InvalidUrlScheme);
    }

    let acquisition = acquire(store, name, url, fetcher, converter).await?;

    let markdown_root = store.markdown_root(name);
    store.rebuild(name, url, acquisition.method, &markdown_root)?;
    store.save()?;

    info!(
        name,
        method = %acquisition.method,
        saved = acquisition.pages_saved,
        "Package downloaded"
    );
    Ok(acquisition)
}

/// Populate a package's on-disk tree, returning how it was acquired
async fn acquire(
    store: &ManifestStore,
    name: &str,
    url: &str,
    fetcher: &dyn Fetcher,
    converter: &dyn Converter,
) -> Result<Acquisition, StashError> {
    let start = Url::parse(url).map_err(|e| StashError::InvalidUrl(e.to_string()))?;

    // Re-download replaces: clear any previous tree for this package
    let package_dir = store.root().join(name);
    match fs::remove_dir_all(&package_dir) {
        Ok(()) => debug!(name, "Removed previous package tree"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }

    let markdown_root = store.markdown_root(name);

    // Single-file probe against the site origin
    let probe_url = start
        .join(SINGLE_FILE_PROBE_PATH)
        .map_err(|e| StashError::InvalidUrl(e.to_string()))?;

    match fetcher.get(probe_url.as_str()).await {
        Ok(page) if page.is_success() && !page.body.trim().is_empty() => {
            info!(url = %probe_url, "Single-file export found");
            write_doc(&markdown_root, SINGLE_FILE_DOC, &page.body)?;
            return Ok(Acquisition {
                method: AcquisitionMethod::SingleFile,
                pages_saved: 1,
                pages_skipped: 0,
            });
        }
        Ok(page) => {
            debug!(url = %probe_url, status = page.status, "Probe unusable, falling back to crawl");
        }
        Err(err) => {
            debug!(url = %probe_url, %err, "Probe failed, falling back to crawl");
        }
    }

    let outcomes = crawl(store, name, &start, fetcher, converter).await?;
    let pages_saved = outcomes
        .iter()
        .filter(|o| matches!(o, PageOutcome::Saved(_)))
        .count();
    let pages_skipped = outcomes.len() - pages_saved;

    if pages_saved == 0 {
        return Err(StashError::AcquisitionFailed {
            url: url.to_string(),
            reason: "single-file probe failed and crawl produced no pages".to_string(),
        });
    }

    Ok(Acquisition {
        method: AcquisitionMethod::Crawl,
        pages_saved,
        pages_skipped,
    })
}

/// Breadth-first same-origin crawl rooted at `start`
///
/// Pages are fetched sequentially. Raw HTML is kept under `<name>/raw/` and
/// converted markdown under `<name>/markdown/`. A page that fails to fetch
/// or convert is recorded as skipped and the crawl continues.
async fn crawl(
    store: &ManifestStore,
    name: &str,
    start: &Url,
    fetcher: &dyn Fetcher,
    converter: &dyn Converter,
) -> Result<Vec<PageOutcome>, StashError> {
    let markdown_root = store.markdown_root(name);
    let raw_root = store.raw_root(name);

    let mut outcomes = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut written: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(Url, usize)> = VecDeque::new();

    let start = strip_locator(start);
    visited.insert(start.to_string());
    queue.push_back((start.clone(), 0));

    while let Some((page_url, depth)) = queue.pop_front() {
        if outcomes.len() >= MAX_CRAWL_PAGES {
            warn!(limit = MAX_CRAWL_PAGES, "Crawl page limit reached");
            break;
        }

        let page = match fetcher.get(page_url.as_str()).await {
            Ok(page) => page,
            Err(err) => {
                outcomes.push(PageOutcome::Skipped {
                    url: page_url.to_string(),
                    reason: format!("fetch failed: {}", err),
                });
                continue;
            }
        };

        if !page.is_success() {
            outcomes.push(PageOutcome::Skipped {
                url: page_url.to_string(),
                reason: format!("status {}", page.status),
            });
            continue;
        }

        if page.is_binary() {
            outcomes.push(PageOutcome::Skipped {
                url: page_url.to_string(),
                reason: "binary content".to_string(),
            });
            continue;
        }

        let rel = crawl_rel_path(&start, &page_url);
        let page_is_html = is_html(page.content_type.as_deref(), &page.body);

        // Distinct URLs can map to the same path (`/guide` and `/guide.html`);
        // the first page keeps the path, later ones are dropped
        if written.contains(&rel) {
            outcomes.push(PageOutcome::Skipped {
                url: page_url.to_string(),
                reason: format!("path collision: {}", rel),
            });
            continue;
        }

        // Convert HTML; keep markdown/plain text verbatim
        let markdown = if page_is_html {
            converter.to_markdown(&page.body)
        } else {
            Some(page.body.clone())
        };

        match markdown {
            Some(md) => {
                if page_is_html {
                    write_doc(&raw_root, &raw_rel_path(&rel), &page.body)?;
                }
                write_doc(&markdown_root, &rel, &md)?;
                debug!(url = %page_url, path = %rel, "Page saved");
                written.insert(rel.clone());
                outcomes.push(PageOutcome::Saved(rel));
            }
            None => {
                outcomes.push(PageOutcome::Skipped {
                    url: page_url.to_string(),
                    reason: "conversion produced no content".to_string(),
                });
            }
        }

        // Discover same-scope links
        if depth < MAX_CRAWL_DEPTH && page_is_html {
            for href in extract_links(&page.body) {
                let Ok(resolved) = page_url.join(&href) else {
                    continue;
                };
                let resolved = strip_locator(&resolved);
                if !within_scope(&start, &resolved) {
                    continue;
                }
                if visited.insert(resolved.to_string()) {
                    queue.push_back((resolved, depth + 1));
                }
            }
        }
    }

    Ok(outcomes)
}

/// Drop query and fragment so equivalent pages dedupe to one visit
fn strip_locator(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Same origin, and at or below the start URL's directory (no-parent)
fn within_scope(start: &Url, candidate: &Url) -> bool {
    if start.origin() != candidate.origin() {
        return false;
    }
    let start_path = start.path();
    if candidate.path() == start_path {
        return true;
    }
    let dir = if start_path.ends_with('/') {
        start_path.to_string()
    } else {
        format!("{}/", start_path)
    };
    candidate.path().starts_with(&dir)
}

/// Map a crawled page URL to a markdown path relative to the package root
///
/// The start page becomes `index.md`, directory-style URLs become
/// `<dir>/index.md`, and leaf pages become `<leaf>.md` (with any
/// `.html`/`.htm` extension replaced).
fn crawl_rel_path(start: &Url, page: &Url) -> String {
    let start_path = start.path();
    let page_path = page.path();

    if page_path == start_path || format!("{}/", page_path) == start_path {
        return "index.md".to_string();
    }

    let dir = if start_path.ends_with('/') {
        start_path.to_string()
    } else {
        format!("{}/", start_path)
    };
    let rel = page_path.strip_prefix(&dir).unwrap_or(page_path);
    let rel = rel.trim_start_matches('/');

    let mapped = if rel.is_empty() || rel.ends_with('/') {
        format!("{}index.md", rel)
    } else if let Some(stem) = rel.strip_suffix(".html").or_else(|| rel.strip_suffix(".htm")) {
        format!("{}.md", stem)
    } else if rel.ends_with(".md") {
        rel.to_string()
    } else {
        format!("{}.md", rel)
    };

    sanitize_rel_path(&mapped)
}

/// Keep generated paths predictable and rooted under the package directory
fn sanitize_rel_path(rel: &str) -> String {
    let mut sanitized: String = rel
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", "_");
    }

    sanitized.trim_start_matches('/').to_string()
}

/// Sibling path for the retained pre-conversion original
fn raw_rel_path(md_rel: &str) -> String {
    match md_rel.strip_suffix(".md") {
        Some(stem) => format!("{}.html", stem),
        None => format!("{}.html", md_rel),
    }
}

/// Write one document, creating parent directories as needed
fn write_doc(root: &Path, rel: &str, content: &str) -> Result<(), StashError> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_within_scope() {
        let start = url("https://x.dev/docs/");
        assert!(within_scope(&start, &url("https://x.dev/docs/")));
        assert!(within_scope(&start, &url("https://x.dev/docs/guide/")));
        assert!(!within_scope(&start, &url("https://x.dev/blog/")));
        assert!(!within_scope(&start, &url("https://other.dev/docs/")));

        let start = url("https://x.dev/docs");
        assert!(within_scope(&start, &url("https://x.dev/docs")));
        assert!(within_scope(&start, &url("https://x.dev/docs/guide")));
        assert!(!within_scope(&start, &url("https://x.dev/docsother")));
    }

    #[test]
    fn test_crawl_rel_path() {
        let start = url("https://x.dev/docs/");
        assert_eq!(crawl_rel_path(&start, &url("https://x.dev/docs/")), "index.md");
        assert_eq!(
            crawl_rel_path(&start, &url("https://x.dev/docs/guide/")),
            "guide/index.md"
        );
        assert_eq!(
            crawl_rel_path(&start, &url("https://x.dev/docs/guide/intro")),
            "guide/intro.md"
        );
        assert_eq!(
            crawl_rel_path(&start, &url("https://x.dev/docs/page.html")),
            "page.md"
        );
    }

    #[test]
    fn test_crawl_rel_path_without_trailing_slash() {
        let start = url("https://x.dev/docs");
        assert_eq!(crawl_rel_path(&start, &url("https://x.dev/docs")), "index.md");
        assert_eq!(
            crawl_rel_path(&start, &url("https://x.dev/docs/api")),
            "api.md"
        );
    }

    #[test]
    fn test_strip_locator() {
        let stripped = strip_locator(&url("https://x.dev/docs/?q=1#frag"));
        assert_eq!(stripped.as_str(), "https://x.dev/docs/");
    }

    #[test]
    fn test_sanitize_rel_path() {
        assert_eq!(sanitize_rel_path("guide/intro.md"), "guide/intro.md");
        assert_eq!(sanitize_rel_path("a b/c?.md"), "a_b/c_.md");
        assert_eq!(sanitize_rel_path("../../etc/passwd.md"), "_/_/etc/passwd.md");
    }
}
