//! Turning a list of range expressions into output files.

use rayon::prelude::*;

use super::options::{output_filename, stem_of, SplitOptions, DEFAULT_STEM};
use super::sink::DownloadSink;
use crate::document::{assemble, SourceDocument, PDF_MIME};
use crate::error::Error;
use crate::range::{parse_expression, RejectedToken};

/// Why an expression produced no file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Expression was empty or whitespace
    Blank,
    /// No usable page survived parsing (and the page policy)
    NoPages,
}

/// What happened to one expression.
#[derive(Debug)]
pub enum SplitStatus {
    /// File delivered to the sink
    Saved { filename: String, pages: usize },
    /// No file produced
    Skipped(SkipReason),
    /// Assembly, serialization or delivery failed
    Failed(Error),
}

/// Result for the expression at `index` (0-based position in the input list).
#[derive(Debug)]
pub struct ExpressionResult {
    pub index: usize,
    pub expression: String,
    pub rejected: Vec<RejectedToken>,
    pub status: SplitStatus,
}

impl ExpressionResult {
    pub fn is_saved(&self) -> bool {
        matches!(self.status, SplitStatus::Saved { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SplitStatus::Failed(_))
    }
}

/// Results of a split run, in expression order.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub results: Vec<ExpressionResult>,
}

impl SplitReport {
    /// Number of files delivered.
    pub fn saved(&self) -> usize {
        self.results.iter().filter(|r| r.is_saved()).count()
    }

    /// Number of expressions that produced nothing without failing.
    pub fn skipped(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.status, SplitStatus::Skipped(_)))
            .count()
    }

    /// Number of expressions that failed.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    /// Names of delivered files, in expression order.
    pub fn filenames(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| match &r.status {
                SplitStatus::Saved { filename, .. } => Some(filename.as_str()),
                _ => None,
            })
            .collect()
    }

    /// True when at least one token in any expression was rejected.
    pub fn has_rejections(&self) -> bool {
        self.results.iter().any(|r| !r.rejected.is_empty())
    }
}

/// Splits one source document by range expressions.
///
/// # Example
///
/// ```no_run
/// use pdfsplit::{DirectorySink, SourceDocument, Splitter};
///
/// let source = SourceDocument::open("book.pdf")?;
/// let report = Splitter::new(&source)
///     .with_file_name("book.pdf")
///     .run(&["1-10", "11,13"], &DirectorySink::new("out"));
/// println!("{} files written", report.saved());
/// # Ok::<(), pdfsplit::Error>(())
/// ```
pub struct Splitter<'a> {
    source: &'a SourceDocument,
    options: SplitOptions,
    stem: String,
}

impl<'a> Splitter<'a> {
    pub fn new(source: &'a SourceDocument) -> Self {
        Self {
            source,
            options: SplitOptions::default(),
            stem: DEFAULT_STEM.to_string(),
        }
    }

    /// Set split options.
    pub fn with_options(mut self, options: SplitOptions) -> Self {
        self.options = options;
        self
    }

    /// Derive output names from the source file name.
    pub fn with_file_name(mut self, file_name: &str) -> Self {
        self.stem = stem_of(file_name);
        self
    }

    /// Produce one file per expression. Each expression is independent:
    /// a failure is recorded in its result and the others carry on.
    pub fn run<S, E>(&self, expressions: &[E], sink: &S) -> SplitReport
    where
        S: DownloadSink + ?Sized,
        E: AsRef<str> + Sync,
    {
        let results = if self.options.parallel {
            expressions
                .par_iter()
                .enumerate()
                .map(|(index, expr)| self.run_one(index, expr.as_ref(), sink))
                .collect()
        } else {
            expressions
                .iter()
                .enumerate()
                .map(|(index, expr)| self.run_one(index, expr.as_ref(), sink))
                .collect()
        };

        SplitReport { results }
    }

    fn run_one<S>(&self, index: usize, expr: &str, sink: &S) -> ExpressionResult
    where
        S: DownloadSink + ?Sized,
    {
        let mut result = ExpressionResult {
            index,
            expression: expr.to_string(),
            rejected: Vec::new(),
            status: SplitStatus::Skipped(SkipReason::Blank),
        };
        if expr.trim().is_empty() {
            return result;
        }

        let parsed = parse_expression(expr);
        result.rejected = parsed.rejected;
        for token in &result.rejected {
            log::debug!("range {}: dropped '{}' ({})", index + 1, token.token, token.reason);
        }

        let indices = match self
            .options
            .policy
            .resolve(&parsed.indices, self.source.page_count())
        {
            Ok(indices) => indices,
            Err(e) => {
                result.status = SplitStatus::Failed(e);
                return result;
            }
        };
        if indices.is_empty() {
            result.status = SplitStatus::Skipped(SkipReason::NoPages);
            return result;
        }

        let filename = output_filename(&self.stem, index + 1, expr, self.options.naming);
        result.status = match self.produce(&indices, &filename, sink) {
            Ok(pages) => SplitStatus::Saved { filename, pages },
            Err(e) => {
                log::warn!("range {} ('{}') failed: {}", index + 1, expr, e);
                SplitStatus::Failed(e)
            }
        };
        result
    }

    fn produce<S>(&self, indices: &[usize], filename: &str, sink: &S) -> crate::Result<usize>
    where
        S: DownloadSink + ?Sized,
    {
        let output = assemble(self.source, indices)?;
        let pages = output.page_count();
        let bytes = output.into_bytes()?;
        sink.deliver(&bytes, filename, PDF_MIME)?;
        log::debug!("{}: {} pages, {} bytes", filename, pages, bytes.len());
        Ok(pages)
    }
}
