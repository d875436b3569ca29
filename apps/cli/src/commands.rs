//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use tracing::info;

use confex_extract::StaticChildMap;
use confex_shared::ExtractionResult;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Confex — normalize wiki storage-format documents for machine consumption.
#[derive(Parser)]
#[command(
    name = "confex",
    version,
    about = "Extract normalized text, tables, links, and attachments from storage-format documents.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Extraction output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Full ExtractionResult as pretty JSON.
    Json,
    /// Only the combined text block.
    Text,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract a storage-format document file.
    Extract {
        /// Path to the storage-format document.
        file: PathBuf,

        /// Document identifier, used for child-listing lookups
        /// (defaults to the file stem).
        #[arg(long)]
        id: Option<String>,

        /// JSON child map ({"parent id": [{"title": ..., "id": ...}]})
        /// used to expand a children macro.
        #[arg(long)]
        children: Option<PathBuf>,

        /// Output format.
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Print only the markdown renderings of a document's tables.
    Tables {
        /// Path to the storage-format document.
        file: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "confex=info",
        1 => "confex=debug",
        _ => "confex=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            file,
            id,
            children,
            format,
        } => cmd_extract(&file, id.as_deref(), children.as_deref(), &format),
        Command::Tables { file } => cmd_tables(&file),
    }
}

fn cmd_extract(
    file: &Path,
    id: Option<&str>,
    children: Option<&Path>,
    format: &OutputFormat,
) -> Result<()> {
    let document_id = id.map(String::from).unwrap_or_else(|| file_stem(file));
    let result = extract_file(file, &document_id, children)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!("{}", result.combined_text);
        }
    }
    Ok(())
}

fn cmd_tables(file: &Path) -> Result<()> {
    let document_id = file_stem(file);
    let result = extract_file(file, &document_id, None)?;

    if result.tables_markdown.is_empty() {
        info!("document has no tables with records");
    } else {
        println!("{}", result.tables_markdown);
    }
    Ok(())
}

/// Read the document and run the extraction engine, with or without a
/// child-map-backed lookup.
fn extract_file(
    file: &Path,
    document_id: &str,
    children: Option<&Path>,
) -> Result<ExtractionResult> {
    let markup = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read document '{}': {e}", file.display()))?;

    info!(
        document_id,
        file = %file.display(),
        markup_len = markup.len(),
        "extracting document"
    );

    let result = match children {
        Some(map_path) => {
            let map = StaticChildMap::from_path(map_path)?;
            confex_extract::normalize_with_children(document_id, &markup, map.as_lookup())
        }
        None => confex_extract::normalize(document_id, &markup),
    };

    Ok(result)
}

fn file_stem(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}
