//! Source documents and the output documents assembled from their pages.

mod assemble;
mod source;

pub use assemble::{assemble, OutputDocument, PagePolicy};
pub use source::{header_version, is_pdf_bytes, SourceDocument};

/// MIME type of every produced file.
pub const PDF_MIME: &str = "application/pdf";
