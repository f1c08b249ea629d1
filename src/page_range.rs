use crate::error::{FolioError, Result};
use std::fmt;
use std::ops::RangeInclusive;

/// An inclusive, 1-based page interval. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 || end == 0 {
            return Err(FolioError::parse(
                &format!("{}-{}", start, end),
                "page numbers must be >= 1",
            ));
        }
        if start > end {
            return Err(FolioError::parse(
                &format!("{}-{}", start, end),
                "range start is greater than range end",
            ));
        }
        Ok(PageRange { start, end })
    }

    pub fn single(page: u32) -> Result<Self> {
        Self::new(page, page)
    }

    /// Parse a single token like "5" or "1-5"
    pub fn parse(s: &str) -> Result<Self> {
        let token = s.trim();
        if token.is_empty() {
            return Err(FolioError::parse(s, "empty page range"));
        }

        match token.split_once('-') {
            Some((start_str, end_str)) => {
                if end_str.contains('-') {
                    return Err(FolioError::parse(token, "more than one '-'"));
                }
                let start = parse_page_number(token, start_str)?;
                let end = parse_page_number(token, end_str)?;
                if start > end {
                    return Err(FolioError::parse(
                        token,
                        "range start is greater than range end",
                    ));
                }
                Ok(PageRange { start, end })
            }
            None => {
                let page = parse_page_number(token, token)?;
                Ok(PageRange {
                    start: page,
                    end: page,
                })
            }
        }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// "N" for a single page, "A-B" otherwise. Used in output file names.
    pub fn label(&self) -> String {
        if self.is_single() {
            self.start.to_string()
        } else {
            format!("{}-{}", self.start, self.end)
        }
    }

    /// 0-based page indices covered by this range, ascending.
    pub fn indices(&self) -> RangeInclusive<u32> {
        (self.start - 1)..=(self.end - 1)
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

fn parse_page_number(token: &str, s: &str) -> Result<u32> {
    let s = s.trim();
    if s.is_empty() {
        return Err(FolioError::parse(token, "missing page number"));
    }
    // u32::from_str accepts a leading '+', which is not part of the grammar
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FolioError::parse(
            token,
            format!("invalid page number '{}'", s),
        ));
    }
    let page = s
        .parse::<u32>()
        .map_err(|_| FolioError::parse(token, format!("page number '{}' is too large", s)))?;
    if page == 0 {
        return Err(FolioError::parse(token, "page numbers must be >= 1"));
    }
    Ok(page)
}

/// Parse a comma-separated list of page ranges like "1-3,5,7-9".
///
/// Token order is kept as given; overlapping or adjacent ranges are neither
/// merged nor reordered.
pub fn parse_page_ranges(s: &str) -> Result<Vec<PageRange>> {
    if s.trim().is_empty() {
        return Err(FolioError::parse(s, "empty page range specification"));
    }
    s.split(',').map(PageRange::parse).collect()
}
