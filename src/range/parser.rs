//! Page range expression parsing.

use serde::Serialize;
use std::fmt;

/// Largest number of pages a single `a-b` token may expand to.
pub const MAX_RANGE_SPAN: usize = 100_000;

/// Why a token contributed no pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Token is not a number and has no hyphen
    NotANumber,
    /// Hyphenated token without exactly two numeric parts
    MalformedRange,
    /// Range whose start is greater than its end
    ReversedRange,
    /// Page numbers start at 1
    ZeroPage,
    /// Range spans more than [`MAX_RANGE_SPAN`] pages
    TooLarge,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RejectReason::NotANumber => "not a page number",
            RejectReason::MalformedRange => "malformed range",
            RejectReason::ReversedRange => "range start is after its end",
            RejectReason::ZeroPage => "page numbers start at 1",
            RejectReason::TooLarge => "range is too large",
        };
        f.write_str(msg)
    }
}

/// A token that was dropped from the index list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedToken {
    /// The trimmed token text
    pub token: String,
    /// Why it was dropped
    pub reason: RejectReason,
}

/// Result of parsing one range expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RangeParse {
    /// Zero-based page indices in expression order, duplicates kept
    pub indices: Vec<usize>,
    /// Tokens that contributed nothing
    pub rejected: Vec<RejectedToken>,
}

impl RangeParse {
    /// True when no page index was produced.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// True when every non-empty token was accepted.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parse a comma-separated page range expression such as `"1,3,5-10"`.
///
/// Page numbers are 1-based in the input and 0-based in the output. Tokens
/// that cannot be used are collected in [`RangeParse::rejected`] rather than
/// failing the whole expression. Indices are not checked against any document.
///
/// ```
/// use pdfsplit::range::parse_expression;
///
/// let parsed = parse_expression("1,3,5-7");
/// assert_eq!(parsed.indices, vec![0, 2, 4, 5, 6]);
/// assert!(parsed.is_clean());
/// ```
pub fn parse_expression(expr: &str) -> RangeParse {
    let mut result = RangeParse::default();

    for token in expr.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match parse_token(token) {
            Ok((start, end)) => result.indices.extend((start - 1)..end),
            Err(reason) => result.rejected.push(RejectedToken {
                token: token.to_string(),
                reason,
            }),
        }
    }

    result
}

/// Parse one token into an inclusive 1-based `(start, end)` pair.
fn parse_token(token: &str) -> Result<(usize, usize), RejectReason> {
    let Some((start, end)) = token.split_once('-') else {
        let page: usize = token.parse().map_err(|_| RejectReason::NotANumber)?;
        if page == 0 {
            return Err(RejectReason::ZeroPage);
        }
        return Ok((page, page));
    };

    let (start, end) = (start.trim(), end.trim());
    if end.contains('-') {
        return Err(RejectReason::MalformedRange);
    }
    let start: usize = start.parse().map_err(|_| RejectReason::MalformedRange)?;
    let end: usize = end.parse().map_err(|_| RejectReason::MalformedRange)?;

    if start == 0 || end == 0 {
        return Err(RejectReason::ZeroPage);
    }
    if start > end {
        return Err(RejectReason::ReversedRange);
    }
    if end - start >= MAX_RANGE_SPAN {
        return Err(RejectReason::TooLarge);
    }
    Ok((start, end))
}
