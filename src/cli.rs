use crate::commands::compress::CompressionLevel;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Split, merge and compress PDF documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level or filter directive (trace/debug/info/warn/error)
    #[arg(long, global = true, env = "FOLIO_LOG")]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a PDF into one file per page, or one file per page range
    #[command(alias = "burst")]
    Split {
        /// PDF file to split
        input: PathBuf,

        /// Directory to write the pieces into (created if missing)
        output_dir: PathBuf,

        /// Comma-separated ranges (e.g., "1-3,5,7-9"); one output per range
        #[arg(short, long)]
        ranges: Option<String>,

        /// Replace files that already exist
        #[arg(long)]
        overwrite: bool,
    },

    /// Merge every PDF and image in a directory into one PDF
    Merge {
        /// Directory holding the files to merge (not searched recursively)
        input_dir: PathBuf,

        /// Output file (replaced if it exists)
        #[arg(default_value = "merged.pdf")]
        output: PathBuf,
    },

    /// Shrink a PDF with Ghostscript
    Compress {
        /// PDF file to compress
        #[arg(required_unless_present = "list_levels")]
        input: Option<PathBuf>,

        /// Output file (default: <name>_compressed.pdf next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression level
        #[arg(short = 'c', long = "compression", value_enum, default_value_t = CompressionLevel::Ebook)]
        level: CompressionLevel,

        /// Replace the output file if it exists
        #[arg(short, long)]
        force: bool,

        /// Print the available levels and exit
        #[arg(long)]
        list_levels: bool,

        /// Ghostscript executable
        #[arg(long = "gs", env = "FOLIO_GHOSTSCRIPT", default_value = "gs")]
        ghostscript: PathBuf,
    },

    /// Show the kind, page count and size of a PDF or image
    Info {
        /// File to inspect
        path: PathBuf,
    },

    /// Run as MCP server over stdio
    Mcp {
        /// Ghostscript executable used by the pdf_compress tool
        #[arg(long = "gs", env = "FOLIO_GHOSTSCRIPT", default_value = "gs")]
        ghostscript: PathBuf,
    },
}

/// Install the global subscriber. Logs always go to stderr; stdout carries
/// command output (or the MCP protocol).
pub fn init_logging(log_level: Option<&str>) -> Result<()> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("invalid log level {:?}: {}", level, e))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))
}
