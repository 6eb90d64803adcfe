//! State behind one split page: selected file, parsed document and ranges.

use std::sync::Arc;

use super::orchestrator::{SplitReport, Splitter};
use super::options::SplitOptions;
use super::sink::DownloadSink;
use crate::document::SourceDocument;
use crate::error::{Error, Result};
use crate::range::RangeList;
use crate::store::Writable;

#[derive(Debug)]
struct SelectedFile {
    name: String,
    generation: u64,
}

/// A pending parse of a selected file.
///
/// Parsing can happen on any thread; hand the result back to
/// [`SplitSession::finish_load`], which drops it if another file was
/// selected (or the selection cleared) in the meantime.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    name: String,
    bytes: Arc<Vec<u8>>,
}

impl LoadTicket {
    /// Name of the selected file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse the selected bytes.
    pub fn parse(&self) -> Result<SourceDocument> {
        SourceDocument::from_bytes(&self.bytes)
    }
}

/// Split page state.
///
/// ```
/// use pdfsplit::SplitSession;
///
/// let mut session = SplitSession::new();
/// let ticket = session.begin_load("broken.pdf", b"not a pdf".to_vec());
/// let result = ticket.parse();
/// assert!(session.finish_load(&ticket, result));
/// assert_eq!(session.page_count(), None);
/// assert!(session.last_error().is_some());
/// assert!(!session.can_split());
/// ```
#[derive(Debug)]
pub struct SplitSession {
    file: Option<SelectedFile>,
    document: Option<Arc<SourceDocument>>,
    ranges: RangeList,
    generation: u64,
    last_error: Option<Error>,
    page_count: Writable<Option<usize>>,
}

impl SplitSession {
    pub fn new() -> Self {
        Self {
            file: None,
            document: None,
            ranges: RangeList::new(),
            generation: 0,
            last_error: None,
            page_count: Writable::new(None),
        }
    }

    /// Select a file. The previous document is dropped right away and the
    /// page count reads as unavailable until the returned ticket is finished.
    pub fn begin_load(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> LoadTicket {
        self.generation += 1;
        let name = name.into();
        self.file = Some(SelectedFile {
            name: name.clone(),
            generation: self.generation,
        });
        self.document = None;
        self.last_error = None;
        self.page_count.set(None);

        LoadTicket {
            generation: self.generation,
            name,
            bytes: Arc::new(bytes),
        }
    }

    /// Apply a parse result. Returns false (and changes nothing) when the
    /// ticket belongs to a selection that is no longer current.
    pub fn finish_load(&mut self, ticket: &LoadTicket, result: Result<SourceDocument>) -> bool {
        let current = self
            .file
            .as_ref()
            .is_some_and(|f| f.generation == ticket.generation);
        if !current {
            log::warn!("discarding stale parse of {}", ticket.name);
            return false;
        }

        match result {
            Ok(document) => {
                self.page_count.set(Some(document.page_count()));
                self.document = Some(Arc::new(document));
            }
            Err(e) => {
                log::warn!("could not read {}: {}", ticket.name, e);
                self.document = None;
                self.page_count.set(None);
                self.last_error = Some(e);
            }
        }
        true
    }

    /// Select and parse a file in one step.
    pub fn load(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> bool {
        let ticket = self.begin_load(name, bytes);
        let result = ticket.parse();
        self.finish_load(&ticket, result)
    }

    /// Drop the selected file and document. Pending tickets become stale.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.file = None;
        self.document = None;
        self.last_error = None;
        self.page_count.set(None);
    }

    /// Name of the selected file.
    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.name.as_str())
    }

    /// Loaded document, if parsing succeeded.
    pub fn document(&self) -> Option<&SourceDocument> {
        self.document.as_deref()
    }

    /// Page count of the loaded document.
    pub fn page_count(&self) -> Option<usize> {
        self.document.as_ref().map(|d| d.page_count())
    }

    /// Observable page count for UI bindings.
    pub fn page_count_store(&self) -> &Writable<Option<usize>> {
        &self.page_count
    }

    /// Why the last selected file could not be read.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn ranges(&self) -> &RangeList {
        &self.ranges
    }

    pub fn ranges_mut(&mut self) -> &mut RangeList {
        &mut self.ranges
    }

    /// Whether the split action is available.
    pub fn can_split(&self) -> bool {
        self.file.is_some() && self.document.is_some() && !self.ranges.all_blank()
    }

    /// Split the loaded document by the current ranges.
    pub fn split<S>(&self, sink: &S, options: SplitOptions) -> Result<SplitReport>
    where
        S: DownloadSink + ?Sized,
    {
        let (Some(file), Some(document)) = (&self.file, &self.document) else {
            return Err(Error::NothingToSplit("no document loaded"));
        };
        if self.ranges.all_blank() {
            return Err(Error::NothingToSplit("every range is blank"));
        }

        Ok(Splitter::new(document)
            .with_options(options)
            .with_file_name(&file.name)
            .run(self.ranges.as_slice(), sink))
    }
}

impl Default for SplitSession {
    fn default() -> Self {
        Self::new()
    }
}
