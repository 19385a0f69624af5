//! Docstash - documentation archiving and retrieval library
//!
//! Downloads a site's documentation as markdown and indexes it in a flat
//! JSON manifest for listing, keyword search, and bulk export.
//!
//! ## Acquisition
//!
//! [`download`] probes the site's single-file `llms.txt` export first; when
//! that fails it falls back to a bounded same-origin crawl with per-page
//! HTML to markdown conversion. Retrieval and conversion sit behind the
//! [`Fetcher`] and [`Converter`] traits so both can be mocked in tests.
//!
//! ## Layout
//!
//! Everything lives under one stash root: `manifest.json` plus a
//! `<name>/markdown/` tree per package (and `<name>/raw/` originals for
//! crawled packages). `find` and `export` read only the manifest, never
//! re-scan the directory tree.

pub mod acquire;
pub mod convert;
mod error;
pub mod export;
pub mod fetch;
pub mod manifest;
pub mod query;
mod types;

pub use acquire::{download, Acquisition, PageOutcome, MAX_CRAWL_DEPTH, MAX_CRAWL_PAGES};
pub use convert::{html_to_markdown, Converter, MarkdownConverter};
pub use error::StashError;
pub use export::export;
pub use fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use manifest::{Manifest, ManifestStore, MANIFEST_FILE};
pub use query::{find, read_content, CONTENT_SCAN_CHARS};
pub use types::{AcquisitionMethod, FileRecord, Package};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "Docstash/0.1";
