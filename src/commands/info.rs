use crate::commands::compress::format_size;
use crate::pdf::{ImageConverter, PageSource, RasterConverter};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub kind: &'static str,
    pub page_count: u32,
    pub size_bytes: u64,
}

pub fn inspect(path: &Path, converter: &dyn ImageConverter) -> Result<SourceInfo> {
    let source = PageSource::open(path, converter)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let size_bytes = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata: {}", path.display()))?
        .len();

    Ok(SourceInfo {
        path: path.to_path_buf(),
        kind: source.kind().as_str(),
        page_count: source.page_count(),
        size_bytes,
    })
}

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let info = inspect(path.as_ref(), &RasterConverter::default())?;

    println!("File: {}", info.path.display());
    println!("Kind: {}", info.kind);
    println!("Pages: {}", info.page_count);
    println!("Size: {}", format_size(info.size_bytes));

    Ok(())
}
