use crate::error::{FolioError, Result};
use lopdf::Document;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Writes finished documents to disk under a fixed collision policy.
///
/// Writes go straight to the destination; they are not atomic. A write that
/// fails part way removes what it wrote, but if `overwrite` was set the file
/// that used to be there is already gone. Callers that need the old file to
/// survive a failure should write to a temporary path and rename.
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    overwrite: bool,
}

impl OutputWriter {
    pub fn new(overwrite: bool) -> Self {
        OutputWriter { overwrite }
    }

    pub fn write(&self, document: &mut Document, path: &Path) -> Result<()> {
        if path.exists() && !self.overwrite {
            return Err(FolioError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FolioError::io(parent, e))?;
        }

        if let Err(err) = save(document, path) {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!("could not remove partial output {}: {}", path.display(), e);
                }
            }
            return Err(err);
        }

        debug!("wrote {}", path.display());
        Ok(())
    }
}

fn save(document: &mut Document, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| FolioError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    document
        .save_to(&mut writer)
        .map_err(|e| FolioError::io(path, e))?;
    writer.flush().map_err(|e| FolioError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::tests::numbered_pdf;
    use tempfile::TempDir;

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/c/out.pdf");

        OutputWriter::new(false)
            .write(&mut numbered_pdf(2), &path)
            .unwrap();

        let written = Document::load(&path).unwrap();
        assert_eq!(written.get_pages().len(), 2);
    }

    #[test]
    fn test_unwritable_destination_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("out.pdf");

        let err = OutputWriter::new(true)
            .write(&mut numbered_pdf(1), &path)
            .unwrap_err();

        assert!(matches!(err, FolioError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_existing_file_is_left_alone_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        fs::write(&path, b"keep me").unwrap();

        let err = OutputWriter::new(false)
            .write(&mut numbered_pdf(2), &path)
            .unwrap_err();

        assert!(matches!(err, FolioError::AlreadyExists { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
    }

    #[test]
    fn test_existing_file_is_replaced_with_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        fs::write(&path, b"old").unwrap();

        OutputWriter::new(true)
            .write(&mut numbered_pdf(7), &path)
            .unwrap();

        let written = Document::load(&path).unwrap();
        assert_eq!(written.get_pages().len(), 7);
    }
}
