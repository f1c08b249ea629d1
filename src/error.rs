//! Error types for the page engine.
//!
//! Command modules wrap these in `anyhow` with context; the core returns
//! them directly so callers (and tests) can match on the failure kind.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FolioError>;

#[derive(Error, Debug)]
pub enum FolioError {
    /// A page-range token was malformed or inverted.
    #[error("Invalid page range '{token}': {reason}")]
    Parse { token: String, reason: String },

    #[error("Input not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Output already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// `page` is 1-based.
    #[error("Page {page} is out of bounds in range {range} (document has {page_count} pages)")]
    OutOfBounds {
        page: u32,
        range: String,
        page_count: u32,
    },

    #[error("No supported files found in {}", dir.display())]
    EmptyInput { dir: PathBuf },

    #[error("Unsupported file kind: {}", path.display())]
    UnsupportedKind { path: PathBuf },

    #[error("{program} failed: {reason}")]
    ExternalProcess { program: String, reason: String },

    #[error("PDF error in {}: {source}", path.display())]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed document: {0}")]
    Structure(#[from] lopdf::Error),
}

impl FolioError {
    pub fn parse(token: &str, reason: impl Into<String>) -> Self {
        FolioError::Parse {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FolioError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn pdf(path: impl Into<PathBuf>, source: lopdf::Error) -> Self {
        FolioError::Pdf {
            path: path.into(),
            source,
        }
    }

    /// Per-item failures that a batch logs and skips instead of aborting.
    pub fn is_skippable(&self) -> bool {
        matches!(self, FolioError::UnsupportedKind { .. })
    }
}
