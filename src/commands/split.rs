use crate::error::{FolioError, Result};
use crate::output::OutputWriter;
use crate::page_range::{parse_page_ranges, PageRange};
use crate::pdf::PageSource;
use anyhow::Context;
use lopdf::Document;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Names the files a split writes: `<stem>_p<N>.pdf` per page,
/// `<stem>_<N>.pdf` or `<stem>_<A>-<B>.pdf` per range.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    dir: PathBuf,
    stem: String,
}

impl OutputNamer {
    pub fn new<P: AsRef<Path>>(dir: P, stem: &str) -> Self {
        OutputNamer {
            dir: dir.as_ref().to_path_buf(),
            stem: stem.to_string(),
        }
    }

    /// `page` is 1-based.
    pub fn for_page(&self, page: u32) -> PathBuf {
        self.dir.join(format!("{}_p{}.pdf", self.stem, page))
    }

    pub fn for_range(&self, range: &PageRange) -> PathBuf {
        self.dir.join(format!("{}_{}.pdf", self.stem, range.label()))
    }
}

/// Build a document holding pages `range.start..=range.end` of `source`,
/// ascending.
pub fn extract_range(source: &PageSource, range: &PageRange) -> Result<Document> {
    let page_ids = range
        .indices()
        .map(|index| {
            source.page(index).ok_or_else(|| FolioError::OutOfBounds {
                page: index + 1,
                range: range.label(),
                page_count: source.page_count(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    source.pdf().extract_pages(&page_ids)
}

/// One single-page file per page, in page order.
pub fn extract_by_page(
    source: &PageSource,
    namer: &OutputNamer,
    writer: &OutputWriter,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for page in 1..=source.page_count() {
        let range = PageRange::single(page)?;
        let mut doc = extract_range(source, &range)?;
        let path = namer.for_page(page);
        writer.write(&mut doc, &path)?;
        debug!("page {} -> {}", page, path.display());
        written.push(path);
    }
    Ok(written)
}

/// One file per range, in the order the ranges were given.
///
/// Each range is built and written before the next is looked at. A failing
/// range stops the batch but does not undo files already written for
/// earlier ranges.
pub fn extract_by_ranges(
    source: &PageSource,
    ranges: &[PageRange],
    namer: &OutputNamer,
    writer: &OutputWriter,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for range in ranges {
        let mut doc = extract_range(source, range)?;
        let path = namer.for_range(range);
        writer.write(&mut doc, &path)?;
        debug!("pages {} ({} pages) -> {}", range, range.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
    ranges: Option<&str>,
    overwrite: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let input = input.as_ref();
    let output_dir = output_dir.as_ref();

    // Reject bad ranges before touching the filesystem.
    let ranges = ranges.map(parse_page_ranges).transpose()?;

    let source = PageSource::document(input)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let namer = OutputNamer::new(output_dir, source.stem());
    let writer = OutputWriter::new(overwrite);

    info!(
        "splitting {} ({} pages) into {}",
        input.display(),
        source.page_count(),
        output_dir.display()
    );
    let written = match &ranges {
        Some(ranges) => extract_by_ranges(&source, ranges, &namer, &writer),
        None => extract_by_page(&source, &namer, &writer),
    }
    .with_context(|| format!("Failed to split {}", input.display()))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::tests::{page_contents, page_marker, write_numbered_pdf};
    use std::fs;
    use tempfile::TempDir;

    fn source_with_pages(dir: &TempDir, name: &str, pages: usize) -> PageSource {
        let path = dir.path().join(name);
        write_numbered_pdf(&path, pages);
        PageSource::document(&path).unwrap()
    }

    fn load(path: &Path) -> Document {
        Document::load(path).unwrap()
    }

    #[test]
    fn test_namer() {
        let namer = OutputNamer::new("/out", "report");
        assert_eq!(namer.for_page(3), PathBuf::from("/out/report_p3.pdf"));
        assert_eq!(
            namer.for_range(&PageRange::parse("5").unwrap()),
            PathBuf::from("/out/report_5.pdf")
        );
        assert_eq!(
            namer.for_range(&PageRange::parse("7-9").unwrap()),
            PathBuf::from("/out/report_7-9.pdf")
        );
    }

    #[test]
    fn test_extract_range_from_ten_pages() {
        let dir = TempDir::new().unwrap();
        let source = source_with_pages(&dir, "ten.pdf", 10);

        let doc = extract_range(&source, &PageRange::parse("2-4").unwrap()).unwrap();
        assert_eq!(
            page_contents(&doc),
            vec![page_marker(2), page_marker(3), page_marker(4)]
        );
    }

    #[test]
    fn test_extract_range_out_of_bounds_names_first_missing_page() {
        let dir = TempDir::new().unwrap();
        let source = source_with_pages(&dir, "ten.pdf", 10);

        let err = extract_range(&source, &PageRange::parse("9-12").unwrap()).unwrap_err();
        match err {
            FolioError::OutOfBounds {
                page,
                range,
                page_count,
            } => {
                assert_eq!(page, 11);
                assert_eq!(range, "9-12");
                assert_eq!(page_count, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_by_page_round_trip() {
        let dir = TempDir::new().unwrap();
        let source = source_with_pages(&dir, "book.pdf", 4);
        let out = dir.path().join("pages");
        let namer = OutputNamer::new(&out, source.stem());

        let written = extract_by_page(&source, &namer, &OutputWriter::new(false)).unwrap();
        assert_eq!(written.len(), 4);

        let mut rebuilt = Vec::new();
        for (i, path) in written.iter().enumerate() {
            assert_eq!(path, &out.join(format!("book_p{}.pdf", i + 1)));
            let doc = load(path);
            assert_eq!(doc.get_pages().len(), 1);
            rebuilt.extend(page_contents(&doc));
        }
        assert_eq!(rebuilt, page_contents(&source.pdf().doc));
    }

    #[test]
    fn test_by_ranges_writes_in_order_and_keeps_overlaps() {
        let dir = TempDir::new().unwrap();
        let source = source_with_pages(&dir, "report.pdf", 10);
        let out = dir.path().join("out");
        let namer = OutputNamer::new(&out, source.stem());
        let ranges = parse_page_ranges("7-9,1-3,5,2-4").unwrap();

        let written =
            extract_by_ranges(&source, &ranges, &namer, &OutputWriter::new(false)).unwrap();

        let names: Vec<_> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "report_7-9.pdf",
                "report_1-3.pdf",
                "report_5.pdf",
                "report_2-4.pdf"
            ]
        );
        assert_eq!(page_contents(&load(&written[2])), vec![page_marker(5)]);
        assert_eq!(load(&written[3]).get_pages().len(), 3);
    }

    #[test]
    fn test_by_ranges_keeps_earlier_outputs_on_failure() {
        let dir = TempDir::new().unwrap();
        let source = source_with_pages(&dir, "report.pdf", 10);
        let out = dir.path().join("out");
        let namer = OutputNamer::new(&out, source.stem());
        let ranges = parse_page_ranges("1-2,9-12,3").unwrap();

        let err =
            extract_by_ranges(&source, &ranges, &namer, &OutputWriter::new(false)).unwrap_err();

        assert!(matches!(err, FolioError::OutOfBounds { page: 11, .. }));
        assert!(out.join("report_1-2.pdf").exists());
        assert!(!out.join("report_9-12.pdf").exists());
        assert!(!out.join("report_3.pdf").exists());
    }

    #[test]
    fn test_existing_output_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let source = source_with_pages(&dir, "report.pdf", 3);
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("report_2.pdf"), b"original").unwrap();
        let namer = OutputNamer::new(&out, source.stem());
        let ranges = parse_page_ranges("1,2").unwrap();

        let err =
            extract_by_ranges(&source, &ranges, &namer, &OutputWriter::new(false)).unwrap_err();

        assert!(matches!(err, FolioError::AlreadyExists { .. }));
        assert!(out.join("report_1.pdf").exists());
        assert_eq!(fs::read(out.join("report_2.pdf")).unwrap(), b"original");
    }

    #[test]
    fn test_existing_output_with_overwrite() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("report.pdf");
        write_numbered_pdf(&input, 3);
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("report_1-3.pdf"), b"stale").unwrap();

        run(&input, &out, Some("1-3"), true).unwrap();

        assert_eq!(load(&out.join("report_1-3.pdf")).get_pages().len(), 3);
    }

    #[test]
    fn test_run_rejects_bad_spec_before_io() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("never-created");

        let err = run(dir.path().join("missing.pdf"), &out, Some("3-1"), false).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FolioError>(),
            Some(FolioError::Parse { .. })
        ));
        assert!(!out.exists());
    }

    #[test]
    fn test_run_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = run(dir.path().join("missing.pdf"), dir.path(), None, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FolioError>(),
            Some(FolioError::NotFound { .. })
        ));
    }
}
