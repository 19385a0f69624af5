//! Example: Archive a documentation site and search it
//!
//! Run with: cargo run -p docstash --example archive_site -- <name> <url>
//!
//! Downloads the docs into ./stash-example, lists the recorded files, and
//! runs a sample query.

use docstash::{download, find, HttpFetcher, ManifestStore, MarkdownConverter};

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let (name, url) = match (args.next(), args.next()) {
        (Some(name), Some(url)) => (name, url),
        _ => {
            eprintln!("Usage: archive_site <name> <url>");
            std::process::exit(1);
        }
    };

    let fetcher = match HttpFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let converter = MarkdownConverter::new();
    let mut store = ManifestStore::open("stash-example");

    println!("Archiving {} from {}...", name, url);
    match download(&mut store, &name, &url, &fetcher, &converter).await {
        Ok(result) => {
            println!(
                "Done: {} file(s) via {} ({} skipped)",
                result.pages_saved, result.method, result.pages_skipped
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(pkg) = store.package(&name) {
        println!("\nRecorded files:");
        for file in &pkg.files {
            println!("  {}  {}", file.path, file.url);
        }

        if let Some(first) = pkg.files.first() {
            let keyword = if first.title.is_empty() {
                "introduction"
            } else {
                &first.title
            };
            match find(&store, &name, keyword) {
                Ok(matches) => println!("\nQuery '{}' matched {} file(s)", keyword, matches.len()),
                Err(e) => eprintln!("Query failed: {}", e),
            }
        }
    }
}
