use super::document::PdfDocument;
use super::raster::{with_temporary_page_file, ImageConverter};
use crate::error::{FolioError, Result};
use lopdf::ObjectId;
use std::fmt;
use std::path::{Path, PathBuf};

const DOCUMENT_EXTS: &[&str] = &["pdf"];
const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    MultiPageDocument,
    SingleImage,
}

impl SourceKind {
    /// Classify a file by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if DOCUMENT_EXTS.contains(&ext.as_str()) {
            Ok(SourceKind::MultiPageDocument)
        } else if IMAGE_EXTS.contains(&ext.as_str()) {
            Ok(SourceKind::SingleImage)
        } else {
            Err(FolioError::UnsupportedKind {
                path: path.to_path_buf(),
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::MultiPageDocument => "document",
            SourceKind::SingleImage => "image",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a document, or of an image promoted to a one-page
/// document, addressed by 0-based page index.
pub struct PageSource {
    kind: SourceKind,
    origin: PathBuf,
    pdf: PdfDocument,
    page_ids: Vec<ObjectId>,
}

impl PageSource {
    /// Open `path` as whatever kind its extension says it is.
    pub fn open(path: &Path, converter: &dyn ImageConverter) -> Result<Self> {
        if !path.exists() {
            return Err(FolioError::NotFound {
                path: path.to_path_buf(),
            });
        }
        match SourceKind::from_path(path)? {
            SourceKind::MultiPageDocument => Self::document(path),
            SourceKind::SingleImage => {
                let bytes = converter.convert(path)?;
                with_temporary_page_file(&bytes, |tmp| Self::converted(tmp, path))
            }
        }
    }

    pub fn document(path: &Path) -> Result<Self> {
        let pdf = PdfDocument::open(path)?;
        Ok(Self::new(SourceKind::MultiPageDocument, path.to_path_buf(), pdf))
    }

    /// Load the one-page document a converter produced for the image at
    /// `origin`; `page_file` is where the converted bytes were materialized.
    pub fn converted(page_file: &Path, origin: &Path) -> Result<Self> {
        let pdf = PdfDocument::open(page_file)?;
        Ok(Self::new(SourceKind::SingleImage, origin.to_path_buf(), pdf))
    }

    fn new(kind: SourceKind, origin: PathBuf, pdf: PdfDocument) -> Self {
        let page_ids = pdf.page_ids();
        PageSource {
            kind,
            origin,
            pdf,
            page_ids,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// The file the caller asked for (the image, for converted sources).
    pub fn path(&self) -> &Path {
        &self.origin
    }

    /// File name without extension, used to name derived outputs.
    pub fn stem(&self) -> &str {
        self.origin
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("page")
    }

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    pub fn page(&self, index: u32) -> Option<ObjectId> {
        self.page_ids.get(index as usize).copied()
    }

    pub fn pdf(&self) -> &PdfDocument {
        &self.pdf
    }

    pub fn into_pdf(self) -> PdfDocument {
        self.pdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::tests::{page_marker, write_numbered_pdf};
    use crate::pdf::raster::tests::write_test_image;
    use crate::pdf::raster::RasterConverter;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("report.pdf", SourceKind::MultiPageDocument)]
    #[case("REPORT.PDF", SourceKind::MultiPageDocument)]
    #[case("scan.jpg", SourceKind::SingleImage)]
    #[case("scan.JPEG", SourceKind::SingleImage)]
    #[case("logo.png", SourceKind::SingleImage)]
    #[case("fax.tif", SourceKind::SingleImage)]
    #[case("fax.tiff", SourceKind::SingleImage)]
    fn test_kind_from_extension(#[case] name: &str, #[case] expected: SourceKind) {
        assert_eq!(SourceKind::from_path(Path::new(name)).unwrap(), expected);
    }

    #[rstest]
    #[case("notes.txt")]
    #[case("archive.pdf.zip")]
    #[case("README")]
    fn test_unsupported_kind(#[case] name: &str) {
        let err = SourceKind::from_path(Path::new(name)).unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedKind { .. }));
    }

    #[test]
    fn test_document_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.pdf");
        write_numbered_pdf(&path, 5);

        let source = PageSource::open(&path, &RasterConverter::default()).unwrap();
        assert_eq!(source.kind(), SourceKind::MultiPageDocument);
        assert_eq!(source.page_count(), 5);
        assert_eq!(source.stem(), "book");

        let last = source.page(4).unwrap();
        assert_eq!(
            source.pdf().doc.get_page_content(last).unwrap(),
            page_marker(5)
        );
        assert!(source.page(5).is_none());
    }

    #[test]
    fn test_image_source_has_one_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        write_test_image(&path, 30, 20);

        let source = PageSource::open(&path, &RasterConverter::default()).unwrap();
        assert_eq!(source.kind(), SourceKind::SingleImage);
        assert_eq!(source.page_count(), 1);
        assert_eq!(source.path(), path.as_path());
    }

    #[test]
    fn test_missing_source() {
        let err = PageSource::open(Path::new("/no/such/file.pdf"), &RasterConverter::default())
            .err()
            .unwrap();
        assert!(matches!(err, FolioError::NotFound { .. }));
    }
}
