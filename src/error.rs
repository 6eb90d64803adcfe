//! Error types for pdfsplit.

use std::io;
use thiserror::Error;

/// Result type alias for pdfsplit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while splitting documents or serving cached assets.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The data does not start with a PDF header.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF header carries a version string we cannot read.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing or writing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// A page index (1-based in the message) is past the end of the document.
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    /// Split was requested without a loaded document or any non-blank range.
    #[error("Nothing to split: {0}")]
    NothingToSplit(&'static str),

    /// The first range slot is permanent.
    #[error("The first range cannot be removed")]
    FirstRangeRemoval,

    /// Range slot index does not exist.
    #[error("Range slot {0} does not exist")]
    NoSuchRange(usize),

    /// Cache storage failure (open, read, write or delete).
    #[error("Cache storage error: {0}")]
    CacheStorage(String),

    /// Network fetch failed before a response was received.
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Precache manifest could not be read.
    #[error("Invalid precache manifest: {0}")]
    Manifest(String),

    /// Operation is not valid in the worker's current lifecycle state.
    #[error("Worker is {state}, cannot {action}")]
    WorkerState {
        state: &'static str,
        action: &'static str,
    },

    /// URL could not be parsed or resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Manifest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange {
            page: 10,
            page_count: 5,
        };
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );
    }

    #[test]
    fn test_worker_state_display() {
        let err = Error::WorkerState {
            state: "installing",
            action: "activate",
        };
        assert_eq!(err.to_string(), "Worker is installing, cannot activate");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_url_error_conversion() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
