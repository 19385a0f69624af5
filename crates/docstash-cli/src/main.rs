//! Docstash CLI - archive, search, and export documentation

use clap::{Parser, Subcommand, ValueEnum};
use docstash::{
    export, find, read_content, FileRecord, HttpFetcher, ManifestStore, MarkdownConverter,
    StashError,
};
use std::io::{self, Write};
use std::path::PathBuf;

/// Maximum entries shown in the fetch disambiguation list
const MAX_DISAMBIGUATION: usize = 10;

/// Output format for the list subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Docstash - download documentation as markdown, then search and export it
#[derive(Parser, Debug)]
#[command(name = "docstash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Stash directory holding manifest.json and package trees
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a site's documentation into the stash
    Download {
        /// Package name to record it under
        name: String,
        /// Documentation URL
        url: String,
    },
    /// List a package's files
    List {
        /// Package name
        name: String,

        /// Output format
        #[arg(long, short, default_value = "text")]
        output: OutputFormat,
    },
    /// Search a package by keyword and print the best match
    Fetch {
        /// Package name
        name: String,
        /// Keyword to search for
        keyword: String,
    },
    /// Concatenate a package's files into one document
    Export {
        /// Package name
        name: String,
        /// Destination path (stdout when omitted)
        output_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download { name, url } => run_download(&cli.root, &name, &url).await,
        Commands::List { name, output } => run_list(&cli.root, &name, output),
        Commands::Fetch { name, keyword } => run_fetch(&cli.root, &name, &keyword),
        Commands::Export { name, output_path } => run_export(&cli.root, &name, output_path),
    }
}

async fn run_download(root: &PathBuf, name: &str, url: &str) {
    let fetcher = match HttpFetcher::new() {
        Ok(fetcher) => fetcher,
        Err(e) => fail(&e.to_string()),
    };
    let converter = MarkdownConverter::new();

    let mut store = ManifestStore::open(root);
    match docstash::download(&mut store, name, url, &fetcher, &converter).await {
        Ok(result) => {
            writeln_safe(&format!(
                "Downloaded {}: {} file(s) via {}",
                name, result.pages_saved, result.method
            ));
            if result.pages_skipped > 0 {
                writeln_safe(&format!("Skipped {} page(s)", result.pages_skipped));
            }
        }
        Err(e) => fail(&e.to_string()),
    }
}

fn run_list(root: &PathBuf, name: &str, output: OutputFormat) {
    let store = ManifestStore::open(root);
    match render_list(&store, name, output) {
        Ok(listing) => writeln_safe(&listing),
        Err(e) => fail(&e.to_string()),
    }
}

/// Render a package's file listing, or fail with `PackageNotFound`
fn render_list(
    store: &ManifestStore,
    name: &str,
    output: OutputFormat,
) -> Result<String, StashError> {
    let package = store
        .package(name)
        .ok_or_else(|| StashError::PackageNotFound(name.to_string()))?;

    match output {
        OutputFormat::Text => Ok(package
            .files
            .iter()
            .map(format_list_line)
            .collect::<Vec<_>>()
            .join("\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&package)?),
    }
}

fn run_fetch(root: &PathBuf, name: &str, keyword: &str) {
    let store = ManifestStore::open(root);
    let matches = match find(&store, name, keyword) {
        Ok(matches) => matches,
        Err(e) => fail(&e.to_string()),
    };

    if matches.is_empty() {
        fail(&format!("No match for '{}' in {}", keyword, name));
    }

    if matches.len() > 1 {
        writeln_safe(&format_disambiguation(&matches));
    }

    match read_content(&store, &matches[0]) {
        Ok(content) => writeln_safe(&content),
        Err(e) => fail(&e.to_string()),
    }
}

fn run_export(root: &PathBuf, name: &str, output_path: Option<PathBuf>) {
    let store = ManifestStore::open(root);
    let doc = match export(&store, name) {
        Ok(doc) => doc,
        Err(e) => fail(&e.to_string()),
    };

    match output_path {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &doc) {
                fail(&format!("Error writing {}: {}", path.display(), e));
            }
            writeln_safe(&format!("Exported {} to {}", name, path.display()));
        }
        None => writeln_safe(&doc),
    }
}

/// One list entry: path, title when present, provenance URL
fn format_list_line(file: &FileRecord) -> String {
    if file.title.is_empty() {
        format!("{}  {}", file.path, file.url)
    } else {
        format!("{}  ({})  {}", file.path, file.title, file.url)
    }
}

/// Disambiguation header shown before the top match's content
fn format_disambiguation(matches: &[FileRecord]) -> String {
    let mut out = format!("Found {} matches:\n", matches.len());
    for file in matches.iter().take(MAX_DISAMBIGUATION) {
        out.push_str("  ");
        out.push_str(&format_list_line(file));
        out.push('\n');
    }
    if matches.len() > MAX_DISAMBIGUATION {
        out.push_str(&format!(
            "  ... and {} more\n",
            matches.len() - MAX_DISAMBIGUATION
        ));
    }
    out.push_str("\nShowing top match:\n");
    out
}

/// Print the error and terminate the command
fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
