//! # pdfsplit
//!
//! Split PDF documents into several files by page range expressions, plus an
//! offline cache worker for the assets of the page that does it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfsplit::{DirectorySink, SourceDocument, Splitter};
//!
//! fn main() -> pdfsplit::Result<()> {
//!     let source = SourceDocument::open("book.pdf")?;
//!     println!("{} pages", source.page_count());
//!
//!     // One output file per expression; pages may repeat or be reordered.
//!     let report = Splitter::new(&source)
//!         .with_file_name("book.pdf")
//!         .run(&["1-3", "10,4,4"], &DirectorySink::new("out"));
//!
//!     for name in report.filenames() {
//!         println!("wrote {}", name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Range expressions
//!
//! Comma-separated page numbers and inclusive `a-b` ranges, 1-based:
//! `"1,3,5-7"` selects pages 1, 3, 5, 6 and 7 in that order. Tokens that do
//! not parse are reported in [`RangeParse::rejected`] instead of failing the
//! whole expression.
//!
//! ## Features
//!
//! - **Range parsing** with per-token rejection reasons
//! - **Page assembly** with reordering and duplication
//! - **Parallel splitting**: expressions are processed with Rayon
//! - **Split session** state with a stale-parse guard
//! - **Offline cache worker**: install / activate / fetch lifecycle over
//!   memory or disk storage

pub mod cache;
pub mod document;
pub mod error;
pub mod range;
pub mod split;
pub mod store;

// Re-export commonly used types
pub use document::{assemble, OutputDocument, PagePolicy, SourceDocument, PDF_MIME};
pub use error::{Error, Result};
pub use range::{parse_expression, RangeList, RangeParse, RejectReason, RejectedToken};
pub use split::{
    DirectorySink, DownloadSink, ExpressionResult, FileNaming, MemorySink, SkipReason,
    SplitOptions, SplitReport, SplitSession, SplitStatus, Splitter,
};

use std::path::Path;

/// Number of pages in a PDF file.
///
/// # Example
///
/// ```no_run
/// let pages = pdfsplit::page_count("document.pdf").unwrap();
/// println!("Pages: {}", pages);
/// ```
pub fn page_count<P: AsRef<Path>>(path: P) -> Result<usize> {
    Ok(SourceDocument::open(path)?.page_count())
}

/// Extract pages from PDF bytes into a new PDF.
///
/// `expr` is a single range expression. Out-of-range pages are an error.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("document.pdf").unwrap();
/// let first_two = pdfsplit::extract_pages(&data, "1-2").unwrap();
/// std::fs::write("first_two.pdf", first_two).unwrap();
/// ```
pub fn extract_pages(data: &[u8], expr: &str) -> Result<Vec<u8>> {
    let source = SourceDocument::from_bytes(data)?;
    let parsed = parse_expression(expr);
    if parsed.is_empty() {
        return Err(Error::NothingToSplit("expression selects no pages"));
    }
    let indices = PagePolicy::Strict.resolve(&parsed.indices, source.page_count())?;
    assemble(&source, &indices)?.into_bytes()
}

/// Split a PDF file into `output_dir`, one file per expression.
///
/// # Example
///
/// ```no_run
/// use pdfsplit::{split_file, SplitOptions};
///
/// let report = split_file("report.pdf", &["1-5", "6-9"], "parts", SplitOptions::default())?;
/// assert_eq!(report.failed(), 0);
/// # Ok::<(), pdfsplit::Error>(())
/// ```
pub fn split_file<P, Q, E>(
    path: P,
    expressions: &[E],
    output_dir: Q,
    options: SplitOptions,
) -> Result<SplitReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    E: AsRef<str> + Sync,
{
    let path = path.as_ref();
    let source = SourceDocument::open(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sink = DirectorySink::new(output_dir.as_ref());

    Ok(Splitter::new(&source)
        .with_options(options)
        .with_file_name(&file_name)
        .run(expressions, &sink))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_extract_pages_empty_data() {
        let data: [u8; 0] = [];
        assert!(matches!(
            extract_pages(&data, "1"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_extract_pages_not_a_pdf() {
        let result = extract_pages(b"<!DOCTYPE html><html></html>", "1");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_page_count_missing_file() {
        let result = page_count("/nonexistent/definitely/missing.pdf");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_split_options_default() {
        let options = SplitOptions::default();
        assert!(options.parallel);
        assert_eq!(options.policy, PagePolicy::Strict);
    }
}
