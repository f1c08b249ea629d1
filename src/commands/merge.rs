use crate::error::{FolioError, Result};
use crate::output::OutputWriter;
use crate::pdf::raster::with_temporary_page_file;
use crate::pdf::{Assembler, ImageConverter, PageSource, RasterConverter, SourceKind};
use anyhow::Context;
use lopdf::Document;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// The ordered inputs of a merge. Order is by file name, case-insensitive,
/// with the exact name breaking ties, and never depends on the order the
/// filesystem listed the directory in.
#[derive(Debug, Clone)]
pub struct MergeManifest {
    dir: PathBuf,
    entries: Vec<ManifestEntry>,
    skipped: Vec<PathBuf>,
}

impl MergeManifest {
    /// Scan the top level of `dir` (no recursion). `exclude` is left out of
    /// the listing; pass the merge destination so a previous result is not
    /// merged into the next one.
    pub fn from_dir(dir: &Path, exclude: Option<&Path>) -> Result<Self> {
        if !dir.exists() {
            return Err(FolioError::NotFound {
                path: dir.to_path_buf(),
            });
        }
        if !dir.is_dir() {
            return Err(FolioError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let excluded = exclude.and_then(|p| p.canonicalize().ok());
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                // the directory itself could not be read
                Err(err) if err.depth() == 0 => return Err(FolioError::io(dir, err.into())),
                Err(err) => {
                    warn!("Skipped: {}", err);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if excluded.is_some() && path.canonicalize().ok() == excluded {
                debug!("leaving merge destination {} out", path.display());
                continue;
            }
            files.push(path);
        }

        Self::from_paths(dir, files)
    }

    /// Order `paths` and classify them. Files of unsupported kinds are
    /// logged and set aside.
    pub fn from_paths(dir: &Path, mut paths: Vec<PathBuf>) -> Result<Self> {
        sort_case_insensitive(&mut paths);

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for path in paths {
            match SourceKind::from_path(&path) {
                Ok(kind) => entries.push(ManifestEntry { path, kind }),
                Err(err) if err.is_skippable() => {
                    warn!("Skipped: {}", err);
                    skipped.push(path);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(MergeManifest {
            dir: dir.to_path_buf(),
            entries,
            skipped,
        })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sort by file name ignoring case; names equal under that rule keep a
/// fixed order by their exact name, then by their raw bytes.
pub fn sort_case_insensitive(paths: &mut [PathBuf]) {
    fn name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
    fn raw(path: &Path) -> &[u8] {
        path.file_name().map(OsStr::as_encoded_bytes).unwrap_or_default()
    }
    paths.sort_by(|a, b| {
        let (name_a, name_b) = (name(a), name(b));
        name_a
            .to_lowercase()
            .cmp(&name_b.to_lowercase())
            .then_with(|| name_a.cmp(&name_b))
            // names that only differ in bytes lost to lossy decoding
            .then_with(|| raw(a).cmp(raw(b)))
    });
}

#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    pub sources: usize,
    pub skipped: usize,
    pub pages: u32,
}

/// Concatenate every manifest entry, in manifest order, into one document.
///
/// Images go through `converter` and are appended from a temporary file
/// that is removed as soon as the append is over.
pub fn merge(
    manifest: &MergeManifest,
    converter: &dyn ImageConverter,
) -> Result<(Document, MergeSummary)> {
    if manifest.is_empty() {
        return Err(FolioError::EmptyInput {
            dir: manifest.dir.clone(),
        });
    }

    let mut assembler = Assembler::new();
    for entry in manifest.entries() {
        let pages = match entry.kind {
            SourceKind::MultiPageDocument => {
                assembler.append(PageSource::document(&entry.path)?)?
            }
            SourceKind::SingleImage => {
                let bytes = converter.convert(&entry.path)?;
                with_temporary_page_file(&bytes, |page_file| {
                    assembler.append(PageSource::converted(page_file, &entry.path)?)
                })?
            }
        };
        debug!("{} ({}): {} page(s)", entry.path.display(), entry.kind, pages);
    }

    let summary = MergeSummary {
        sources: assembler.source_count(),
        skipped: manifest.skipped().len(),
        pages: assembler.page_count(),
    };
    Ok((assembler.finish(), summary))
}

/// Merge the supported files of `input_dir` into `output`, replacing it.
pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input_dir: P,
    output: Q,
) -> anyhow::Result<MergeSummary> {
    let input_dir = input_dir.as_ref();
    let output = output.as_ref();

    let manifest = MergeManifest::from_dir(input_dir, Some(output))?;
    info!(
        "merging {} file(s) from {}",
        manifest.entries().len(),
        input_dir.display()
    );

    let (mut merged, summary) = merge(&manifest, &RasterConverter::default())
        .with_context(|| format!("Failed to merge {}", input_dir.display()))?;

    OutputWriter::new(true)
        .write(&mut merged, output)
        .with_context(|| format!("Failed to save merged PDF: {}", output.display()))?;

    Ok(summary)
}
