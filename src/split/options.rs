//! Split options and output file naming.

use std::path::Path;

use md5::{Digest, Md5};

use crate::document::PagePolicy;

/// Stem used when the source file name is unknown.
pub const DEFAULT_STEM: &str = "split";

/// Longest stem, in bytes, kept in output file names.
pub const MAX_STEM_LEN: usize = 100;

/// Longest expression label, in bytes, kept in output file names. Longer
/// labels are cut and suffixed with a hash of the whole label.
pub const MAX_LABEL_LEN: usize = 64;

const LABEL_HASH_LEN: usize = 8;

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileNaming {
    /// `{stem}-{n}-{expression}.pdf`
    #[default]
    Expression,
    /// `{stem}-{n}.pdf`
    Index,
}

/// Options for a split run.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Process expressions in parallel
    pub parallel: bool,

    /// Handling of page numbers past the end of the document
    pub policy: PagePolicy,

    /// Output naming scheme
    pub naming: FileNaming,
}

impl SplitOptions {
    /// Create new split options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the out-of-range page policy.
    pub fn with_policy(mut self, policy: PagePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drop out-of-range pages instead of failing.
    pub fn skip_missing(mut self) -> Self {
        self.policy = PagePolicy::SkipMissing;
        self
    }

    /// Set the naming scheme.
    pub fn with_naming(mut self, naming: FileNaming) -> Self {
        self.naming = naming;
        self
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            policy: PagePolicy::Strict,
            naming: FileNaming::Expression,
        }
    }
}

/// File stem of a source file name, or [`DEFAULT_STEM`].
pub fn stem_of(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STEM.to_string())
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Expression label: digits and `-` kept, `,` mapped to `_`, capped at
/// [`MAX_LABEL_LEN`] bytes.
fn expression_label(expr: &str) -> String {
    let label: String = expr
        .chars()
        .filter_map(|c| match c {
            ',' => Some('_'),
            '0'..='9' | '-' => Some(c),
            _ => None,
        })
        .collect();

    if label.len() <= MAX_LABEL_LEN {
        return label;
    }
    let hash = format!("{:x}", Md5::digest(label.as_bytes()));
    // Label is ASCII, so byte slicing is safe.
    let keep = MAX_LABEL_LEN - LABEL_HASH_LEN - 1;
    format!("{}~{}", &label[..keep], &hash[..LABEL_HASH_LEN])
}

/// Build the file name for the `position`-th expression (1-based).
///
/// The result stays well under the usual 255-byte file name limit however
/// long the stem or expression is.
pub fn output_filename(stem: &str, position: usize, expr: &str, naming: FileNaming) -> String {
    let stem = truncate_to(stem, MAX_STEM_LEN);
    let label = match naming {
        FileNaming::Expression => expression_label(expr),
        FileNaming::Index => String::new(),
    };

    if label.is_empty() {
        format!("{}-{}.pdf", stem, position)
    } else {
        format!("{}-{}-{}.pdf", stem, position, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_options_builder() {
        let options = SplitOptions::new().sequential().skip_missing();
        assert!(!options.parallel);
        assert_eq!(options.policy, PagePolicy::SkipMissing);
        assert_eq!(options.naming, FileNaming::Expression);
    }

    #[test]
    fn test_stem_of() {
        assert_eq!(stem_of("report.pdf"), "report");
        assert_eq!(stem_of("dir/annual report.pdf"), "annual report");
        assert_eq!(stem_of(""), DEFAULT_STEM);
    }

    #[test]
    fn test_output_filename_from_expression() {
        assert_eq!(
            output_filename("report", 1, "1, 3, 5-7", FileNaming::Expression),
            "report-1-1_3_5-7.pdf"
        );
        assert_eq!(
            output_filename("report", 2, "4", FileNaming::Index),
            "report-2.pdf"
        );
    }

    #[test]
    fn test_output_filename_strips_path_characters() {
        assert_eq!(
            output_filename("x", 3, "../1/2", FileNaming::Expression),
            "x-3-12.pdf"
        );
        assert_eq!(output_filename("x", 4, "abc", FileNaming::Expression), "x-4.pdf");
    }

    #[test]
    fn test_output_filename_caps_long_expression() {
        let expr: Vec<String> = (1..=100).map(|n| n.to_string()).collect();
        let expr = expr.join(",");

        let name = output_filename("book", 1, &expr, FileNaming::Expression);
        assert!(name.starts_with("book-1-1_2_3_"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "book-1-".len() + MAX_LABEL_LEN + ".pdf".len());

        // Different long expressions keep different names.
        let other = output_filename("book", 1, &format!("{},101", expr), FileNaming::Expression);
        assert_ne!(name, other);
        assert_eq!(
            name,
            output_filename("book", 1, &expr, FileNaming::Expression)
        );
    }

    #[test]
    fn test_output_filename_caps_long_stem() {
        let stem = "é".repeat(200);
        let name = output_filename(&stem, 12, "1-3", FileNaming::Expression);
        assert!(name.len() <= MAX_STEM_LEN + "-12-1-3.pdf".len());
        assert!(name.ends_with("-12-1-3.pdf"));

        let indexed = output_filename(&"x".repeat(300), 2, "", FileNaming::Index);
        assert_eq!(indexed.len(), MAX_STEM_LEN + "-2.pdf".len());
    }
}
