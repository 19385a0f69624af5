//! Package export
//!
//! Concatenates a package's markdown files, in manifest order, into one
//! document with per-file provenance headers. The whole document is
//! assembled in memory before anything is written, so a failed export never
//! leaves a half-written file behind.

use crate::error::StashError;
use crate::manifest::ManifestStore;
use crate::types::AcquisitionMethod;
use std::fs;
use tracing::{debug, warn};

/// Build the combined export document for a package
///
/// Output is deterministic: two exports with no intervening download are
/// byte-identical. Single-file packages with exactly one document are
/// emitted verbatim, since that document already is the combined form.
pub fn export(store: &ManifestStore, package_name: &str) -> Result<String, StashError> {
    let package = store
        .package(package_name)
        .ok_or_else(|| StashError::PackageNotFound(package_name.to_string()))?;

    if package.method == AcquisitionMethod::SingleFile && package.files.len() == 1 {
        debug!(package = package_name, "Exporting single-file package verbatim");
        return Ok(fs::read_to_string(store.root().join(&package.files[0].file))?);
    }

    let mut out = String::new();
    for file in &package.files {
        let content = match fs::read_to_string(store.root().join(&file.file)) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %file.file, %err, "Skipping unreadable file in export");
                continue;
            }
        };

        out.push_str(&format!("<!-- file: {} -->\n", file.path));
        out.push_str(&format!("<!-- source: {} -->\n", file.url));
        out.push('\n');
        out.push_str(&content);
        if !content.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str("---\n");
    }

    debug!(package = package_name, bytes = out.len(), "Export assembled");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileRecord, Package};
    use tempfile::TempDir;

    fn store_with(
        dir: &TempDir,
        method: AcquisitionMethod,
        files: Vec<(&str, &str)>,
    ) -> ManifestStore {
        let records = files
            .iter()
            .map(|(path, content)| {
                let file = format!("pkg/markdown/{}", path);
                let disk = dir.path().join(&file);
                fs::create_dir_all(disk.parent().unwrap()).unwrap();
                fs::write(&disk, content).unwrap();
                FileRecord::new(*path, "", format!("https://x.dev/{}", path), file)
            })
            .collect();

        let mut store = ManifestStore::open(dir.path());
        store.upsert(Package::new("pkg", "https://x.dev", method, records));
        store
    }

    #[test]
    fn test_unknown_package() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::open(dir.path());
        assert!(matches!(
            export(&store, "missing"),
            Err(StashError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_export_wraps_files_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            AcquisitionMethod::Crawl,
            vec![("b.md", "# B\nsecond"), ("a.md", "# A\nfirst")],
        );

        let doc = export(&store, "pkg").unwrap();

        let a_pos = doc.find("<!-- file: a.md -->").unwrap();
        let b_pos = doc.find("<!-- file: b.md -->").unwrap();
        assert!(a_pos < b_pos);
        assert!(doc.contains("<!-- source: https://x.dev/a.md -->"));
        assert!(doc.contains("# A\nfirst"));
        assert!(doc.contains("\n---\n"));
    }

    #[test]
    fn test_export_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            AcquisitionMethod::Crawl,
            vec![("a.md", "alpha"), ("b.md", "beta")],
        );

        let first = export(&store, "pkg").unwrap();
        let second = export(&store, "pkg").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_file_verbatim() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            AcquisitionMethod::SingleFile,
            vec![("llms.md", "# Everything\nall the docs")],
        );

        let doc = export(&store, "pkg").unwrap();
        assert_eq!(doc, "# Everything\nall the docs");
        assert!(!doc.contains("<!-- file:"));
    }

    #[test]
    fn test_multi_file_single_file_method_still_wraps() {
        let dir = TempDir::new().unwrap();
        let store = store_with(
            &dir,
            AcquisitionMethod::SingleFile,
            vec![("a.md", "one"), ("b.md", "two")],
        );

        let doc = export(&store, "pkg").unwrap();
        assert!(doc.contains("<!-- file: a.md -->"));
        assert!(doc.contains("<!-- file: b.md -->"));
    }

    #[test]
    fn test_unreadable_file_skipped() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with(&dir, AcquisitionMethod::Crawl, vec![("a.md", "alpha")]);
        let mut pkg = store.package("pkg").unwrap().clone();
        pkg.files.push(FileRecord::new(
            "ghost.md",
            "",
            "https://x.dev/ghost/",
            "pkg/markdown/ghost.md",
        ));
        let pkg = Package::new("pkg", "https://x.dev", AcquisitionMethod::Crawl, pkg.files);
        store.upsert(pkg);

        let doc = export(&store, "pkg").unwrap();
        assert!(doc.contains("<!-- file: a.md -->"));
        assert!(!doc.contains("ghost"));
    }
}
