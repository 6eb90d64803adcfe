//! Build-time list of assets the worker precaches.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Static files whose path contains this marker are never precached.
pub const EXCLUDED_MARKER: &str = ".nojekyll";

/// Asset paths produced by the build, as found in `manifest.json`:
///
/// ```json
/// { "build": ["/_app/start.js"], "files": ["/favicon.png", "/.nojekyll"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheManifest {
    /// Build output paths
    #[serde(default)]
    pub build: Vec<String>,

    /// Static file paths
    #[serde(default)]
    pub files: Vec<String>,
}

impl PrecacheManifest {
    pub fn new(build: Vec<String>, files: Vec<String>) -> Self {
        Self { build, files }
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a manifest file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Manifest(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Paths to precache: build outputs, then static files without the marker.
    pub fn assets(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.build
            .iter()
            .chain(self.files.iter().filter(|f| !f.contains(EXCLUDED_MARKER)))
            .filter(|path| seen.insert(path.as_str()))
            .cloned()
            .collect()
    }
}
