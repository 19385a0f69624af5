//! Manifest store
//!
//! One flat JSON document (`manifest.json` at the stash root) indexes every
//! archived package. The store is load-mutate-save per invocation: a rebuild
//! replaces the whole package entry and a save rewrites the whole document
//! through a temp file, so a partially written manifest is never observable.

use crate::error::StashError;
use crate::types::{normalize_url, AcquisitionMethod, FileRecord, Package};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Manifest file name at the stash root
pub const MANIFEST_FILE: &str = "manifest.json";

/// The persisted index of all packages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// All archived packages, one entry per name
    pub packages: Vec<Package>,
}

/// Manifest store rooted at a stash directory
///
/// The root directory holds `manifest.json` plus one `<name>/markdown/` tree
/// (and, for crawled packages, `<name>/raw/`) per package.
pub struct ManifestStore {
    root: PathBuf,
    manifest: Manifest,
}

impl ManifestStore {
    /// Open the store at the given root, loading `manifest.json` if present
    ///
    /// A missing manifest is an empty store. A corrupt manifest is logged and
    /// treated as empty; the next save rewrites it whole.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let path = root.join(MANIFEST_FILE);

        let manifest = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(manifest) => manifest,
                Err(err) => {
                    warn!(path = %path.display(), %err, "Manifest is corrupt, starting empty");
                    Manifest::default()
                }
            },
            Err(_) => Manifest::default(),
        };

        Self { root, manifest }
    }

    /// Stash root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the manifest file
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Markdown root directory for a package
    pub fn markdown_root(&self, name: &str) -> PathBuf {
        self.root.join(name).join("markdown")
    }

    /// Raw HTML directory for a crawled package
    pub fn raw_root(&self, name: &str) -> PathBuf {
        self.root.join(name).join("raw")
    }

    /// All packages in the store
    pub fn packages(&self) -> &[Package] {
        &self.manifest.packages
    }

    /// Look up a package by name
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.manifest.packages.iter().find(|p| p.name == name)
    }

    /// Insert a package, replacing any existing entry with the same name
    pub fn upsert(&mut self, package: Package) {
        self.manifest.packages.retain(|p| p.name != package.name);
        self.manifest.packages.push(package);
    }

    /// Persist the whole manifest
    ///
    /// Writes to a temp file in the root and renames over the target, so the
    /// manifest on disk is always either the old or the new document.
    pub fn save(&self) -> Result<(), StashError> {
        fs::create_dir_all(&self.root)?;
        let path = self.manifest_path();
        let tmp = self.root.join(format!("{}.tmp", MANIFEST_FILE));

        let json = serde_json::to_string_pretty(&self.manifest)?;
        fs::write(&tmp, json).map_err(|source| StashError::ManifestWrite {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StashError::ManifestWrite {
            path: path.display().to_string(),
            source,
        })?;

        debug!(path = %path.display(), "Manifest saved");
        Ok(())
    }

    /// Rebuild a package entry from the markdown files on disk
    ///
    /// Scans `markdown_root` recursively for `.md` files, extracts a title
    /// from each file's first line, derives provenance URLs, and replaces any
    /// existing entry of the same name. The caller is expected to `save()`
    /// afterwards.
    pub fn rebuild(
        &mut self,
        name: &str,
        source_url: &str,
        method: AcquisitionMethod,
        markdown_root: &Path,
    ) -> Result<&Package, StashError> {
        let source_url = normalize_url(source_url);
        let mut rel_paths = Vec::new();
        collect_markdown_files(markdown_root, markdown_root, &mut rel_paths)?;
        rel_paths.sort();

        let files = rel_paths
            .into_iter()
            .map(|rel| {
                let disk_path = markdown_root.join(&rel);
                let title = extract_title(&disk_path);
                let url = match method {
                    AcquisitionMethod::SingleFile => source_url.clone(),
                    AcquisitionMethod::Crawl => url_for_crawl_path(&source_url, &rel),
                };
                let file = match disk_path.strip_prefix(&self.root) {
                    Ok(p) => path_to_slash(p),
                    Err(_) => disk_path.display().to_string(),
                };
                FileRecord::new(rel, title, url, file)
            })
            .collect();

        let package = Package::new(name, source_url, method, files);
        debug!(name, count = package.file_count, "Rebuilt package entry");
        self.upsert(package);

        // upsert pushes to the back
        Ok(self
            .manifest
            .packages
            .last()
            .unwrap_or_else(|| unreachable!("package was just inserted")))
    }
}

/// Recursively collect `.md` files under `dir` as slash-separated relative paths
fn collect_markdown_files(
    base: &Path,
    dir: &Path,
    out: &mut Vec<String>,
) -> Result<(), StashError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // Missing markdown root means an empty package, not a failure
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_markdown_files(base, &path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            if let Ok(rel) = path.strip_prefix(base) {
                out.push(path_to_slash(rel));
            }
        }
    }
    Ok(())
}

/// Render a path with forward slashes regardless of platform
fn path_to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Best-effort title: first line of the file, heading markup stripped
///
/// Unreadable files yield an empty title; the file still gets a record.
fn extract_title(path: &Path) -> String {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), %err, "Could not read file for title extraction");
            return String::new();
        }
    };

    text.lines()
        .next()
        .map(|line| line.trim().trim_start_matches('#').trim().to_string())
        .unwrap_or_default()
}

/// Reconstruct a directory-style source URL from a crawled file's path
///
/// `guide/intro.md` becomes `<base>/guide/intro/` and `guide/index.md`
/// becomes `<base>/guide/`. Best-effort: sites with non-standard routing may
/// use different URLs than this derivation produces.
pub fn url_for_crawl_path(base_url: &str, rel_path: &str) -> String {
    let base = base_url.trim_end_matches('/');

    if rel_path == "index.md" {
        return format!("{}/", base);
    }
    if let Some(dir) = rel_path.strip_suffix("/index.md") {
        return format!("{}/{}/", base, dir);
    }
    if let Some(stem) = rel_path.strip_suffix(".md") {
        return format!("{}/{}/", base, stem);
    }
    format!("{}/{}", base, rel_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_open_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::open(dir.path());
        assert!(store.packages().is_empty());
    }

    #[test]
    fn test_open_corrupt_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "{not json").unwrap();
        let store = ManifestStore::open(dir.path());
        assert!(store.packages().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut store = ManifestStore::open(dir.path());
        store.upsert(Package::new(
            "demo",
            "https://example.com",
            AcquisitionMethod::Crawl,
            vec![],
        ));
        store.save().unwrap();

        let reloaded = ManifestStore::open(dir.path());
        assert_eq!(reloaded.packages().len(), 1);
        assert_eq!(reloaded.package("demo").unwrap().url, "https://example.com");
        assert!(!dir.path().join("manifest.json.tmp").exists());
    }

    #[test]
    fn test_upsert_replaces_same_name() {
        let dir = TempDir::new().unwrap();
        let mut store = ManifestStore::open(dir.path());
        store.upsert(Package::new(
            "demo",
            "https://a.example",
            AcquisitionMethod::Crawl,
            vec![],
        ));
        store.upsert(Package::new(
            "demo",
            "https://b.example",
            AcquisitionMethod::SingleFile,
            vec![],
        ));

        assert_eq!(store.packages().len(), 1);
        assert_eq!(store.package("demo").unwrap().url, "https://b.example");
    }

    #[test]
    fn test_rebuild_scans_and_sorts() {
        let dir = TempDir::new().unwrap();
        let md_root = dir.path().join("demo").join("markdown");
        write_file(&md_root, "zeta.md", "# Zeta Page\nbody");
        write_file(&md_root, "guide/intro.md", "## Intro Guide\nbody");
        write_file(&md_root, "guide/index.md", "Overview\nbody");
        write_file(&md_root, "notes.txt", "not markdown");

        let mut store = ManifestStore::open(dir.path());
        let pkg = store
            .rebuild("demo", "https://example.com/", AcquisitionMethod::Crawl, &md_root)
            .unwrap();

        let paths: Vec<&str> = pkg.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["guide/index.md", "guide/intro.md", "zeta.md"]);
        assert_eq!(pkg.file_count, 3);
        assert_eq!(pkg.url, "https://example.com");

        assert_eq!(pkg.files[0].title, "Overview");
        assert_eq!(pkg.files[1].title, "Intro Guide");
        assert_eq!(pkg.files[2].title, "Zeta Page");

        assert_eq!(pkg.files[0].url, "https://example.com/guide/");
        assert_eq!(pkg.files[1].url, "https://example.com/guide/intro/");
        assert_eq!(pkg.files[2].url, "https://example.com/zeta/");

        assert_eq!(pkg.files[2].file, "demo/markdown/zeta.md");
    }

    #[test]
    fn test_rebuild_single_file_urls() {
        let dir = TempDir::new().unwrap();
        let md_root = dir.path().join("demo").join("markdown");
        write_file(&md_root, "llms.md", "# All the docs");

        let mut store = ManifestStore::open(dir.path());
        let pkg = store
            .rebuild(
                "demo",
                "https://example.com",
                AcquisitionMethod::SingleFile,
                &md_root,
            )
            .unwrap();

        assert_eq!(pkg.file_count, 1);
        assert_eq!(pkg.files[0].url, "https://example.com");
    }

    #[test]
    fn test_rebuild_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let md_root = dir.path().join("demo").join("markdown");

        let mut store = ManifestStore::open(dir.path());
        let pkg = store
            .rebuild("demo", "https://example.com", AcquisitionMethod::Crawl, &md_root)
            .unwrap();
        assert_eq!(pkg.file_count, 0);
    }

    #[test]
    fn test_url_for_crawl_path() {
        assert_eq!(
            url_for_crawl_path("https://x.dev", "index.md"),
            "https://x.dev/"
        );
        assert_eq!(
            url_for_crawl_path("https://x.dev", "guide/index.md"),
            "https://x.dev/guide/"
        );
        assert_eq!(
            url_for_crawl_path("https://x.dev/", "guide/intro.md"),
            "https://x.dev/guide/intro/"
        );
    }

    #[test]
    fn test_extract_title_strips_heading_markup() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.md", "### Deep Title\nrest");
        write_file(dir.path(), "b.md", "Plain first line");
        write_file(dir.path(), "c.md", "");
        write_file(dir.path(), "d.md", "  # Indented Title\nrest");

        assert_eq!(extract_title(&dir.path().join("a.md")), "Deep Title");
        assert_eq!(extract_title(&dir.path().join("b.md")), "Plain first line");
        assert_eq!(extract_title(&dir.path().join("c.md")), "");
        assert_eq!(extract_title(&dir.path().join("d.md")), "Indented Title");
        assert_eq!(extract_title(&dir.path().join("missing.md")), "");
    }
}
