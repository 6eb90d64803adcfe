//! Splitting a document into one output file per range expression.

mod options;
mod orchestrator;
mod session;
mod sink;

pub use options::{output_filename, stem_of, FileNaming, SplitOptions, DEFAULT_STEM};
pub use orchestrator::{ExpressionResult, SkipReason, SplitReport, SplitStatus, Splitter};
pub use session::{LoadTicket, SplitSession};
pub use sink::{DeliveredFile, DirectorySink, DownloadSink, MemorySink};
