//! Destinations for finished output files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Result;

/// Receives finished files. Returns once the file has been handed off.
///
/// Called from several threads at once when splitting in parallel.
pub trait DownloadSink: Send + Sync {
    /// Deliver `data` under `filename` with the given MIME type.
    fn deliver(&self, data: &[u8], filename: &str, mime: &str) -> Result<()>;
}

/// Writes each file into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into `dir`. The directory is created on first delivery.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, data: &[u8], filename: &str, _mime: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        fs::write(&path, data)?;
        log::info!("wrote {} ({} bytes)", path.display(), data.len());
        Ok(())
    }
}

/// A file captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredFile {
    pub filename: String,
    pub mime: String,
    pub data: Vec<u8>,
}

/// Keeps delivered files in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<DeliveredFile>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every delivered file, sorted by name.
    pub fn take(&self) -> Vec<DeliveredFile> {
        let mut files = std::mem::take(&mut *self.lock());
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        files
    }

    /// Number of files delivered so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DeliveredFile>> {
        self.files
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DownloadSink for MemorySink {
    fn deliver(&self, data: &[u8], filename: &str, mime: &str) -> Result<()> {
        self.lock().push(DeliveredFile {
            filename: filename.to_string(),
            mime: mime.to_string(),
            data: data.to_vec(),
        });
        Ok(())
    }
}
