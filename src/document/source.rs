//! Loading the document that pages are copied from.

use std::fs;
use std::path::Path;

use lopdf::{Document as LopdfDocument, ObjectId};

use crate::error::{Error, Result};

/// Header magic every PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// A parsed source PDF with its pages in display order.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    doc: LopdfDocument,
    page_ids: Vec<ObjectId>,
    version: String,
}

impl SourceDocument {
    /// Parse a PDF held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let version = header_version(data)?;

        let doc = LopdfDocument::load_mem(data)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }

        // get_pages is keyed by 1-based page number, so values come out in page order
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        log::debug!("loaded PDF {} with {} pages", version, page_ids.len());

        Ok(Self {
            doc,
            page_ids,
            version,
        })
    }

    /// Read and parse a PDF file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// PDF version from the file header, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Object id of the page at a zero-based index.
    pub fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.page_ids.get(index).copied()
    }

    pub(crate) fn lopdf(&self) -> &LopdfDocument {
        &self.doc
    }
}

/// Read the `x.y` version out of a `%PDF-x.y` header.
pub fn header_version(data: &[u8]) -> Result<String> {
    let rest = data.strip_prefix(PDF_MAGIC).ok_or(Error::UnknownFormat)?;
    let version = rest.get(..3).ok_or(Error::UnknownFormat)?;

    match version {
        [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Ok(String::from_utf8_lossy(version).into_owned())
        }
        _ => Err(Error::UnsupportedVersion(
            String::from_utf8_lossy(version).into_owned(),
        )),
    }
}

/// Check whether bytes start with a readable PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    header_version(data).is_ok()
}
