//! Offline cache worker: precaches assets on install, drops old caches on
//! activation and answers GET requests from cache or network.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use url::Url;

use super::http::{is_cacheable_scheme, Fetcher, Method, Request, Response};
use super::manifest::PrecacheManifest;
use super::storage::{Cache, CacheStorage};
use crate::error::{Error, Result};

/// Message type that activates a waiting worker right away.
pub const SKIP_WAITING: &str = "SKIP_WAITING";

/// Cache name used for a build version.
pub fn cache_name_for(version: &str) -> String {
    format!("cache-{}", version)
}

/// Worker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, precache not finished
    Installing,
    /// Precache complete, waiting to take over
    Installed,
    /// Removing caches of older versions
    Activating,
    /// Handling fetches
    Active,
    /// Install failed or superseded
    Redundant,
}

impl WorkerState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Control message posted to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Activate now instead of waiting for clients to go away
    SkipWaiting,
    /// Anything else; ignored
    Unknown(String),
}

impl WorkerMessage {
    /// Parse a `{"type": "..."}` payload. Returns `None` for payloads with no type.
    pub fn from_json(payload: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(rename = "type")]
            kind: Option<String>,
        }

        let envelope: Envelope = serde_json::from_str(payload).ok()?;
        Some(match envelope.kind?.as_str() {
            SKIP_WAITING => WorkerMessage::SkipWaiting,
            other => WorkerMessage::Unknown(other.to_string()),
        })
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Base URL that manifest paths are resolved against
    pub origin: Url,

    /// Build version; names the cache
    pub version: String,

    /// Assets to precache
    pub manifest: PrecacheManifest,
}

impl WorkerConfig {
    pub fn new(origin: &str, version: impl Into<String>, manifest: PrecacheManifest) -> Result<Self> {
        Ok(Self {
            origin: Url::parse(origin)?,
            version: version.into(),
            manifest,
        })
    }

    /// Name of this version's cache.
    pub fn cache_name(&self) -> String {
        cache_name_for(&self.version)
    }
}

/// The offline cache worker.
pub struct OfflineWorker {
    config: WorkerConfig,
    cache_name: String,
    assets: Vec<String>,
    asset_paths: HashSet<String>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<WorkerState>,
    /// Set by the first `install` call
    install_started: AtomicBool,
}

impl OfflineWorker {
    /// Create a worker in the `Installing` state.
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self::with_state(config, storage, fetcher, WorkerState::Installing)
    }

    /// Create a worker for a version whose precache finished earlier and
    /// that is waiting to be activated.
    pub fn installed(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self::with_state(config, storage, fetcher, WorkerState::Installed)
    }

    /// Create a worker for a version that was installed and activated earlier.
    pub fn attach(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self::with_state(config, storage, fetcher, WorkerState::Active)
    }

    fn with_state(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        state: WorkerState,
    ) -> Self {
        let assets = config.manifest.assets();
        log::debug!(
            "worker for version {}: {} assets {:?}",
            config.version,
            assets.len(),
            assets
        );
        Self {
            cache_name: config.cache_name(),
            asset_paths: assets.iter().cloned().collect(),
            assets,
            config,
            storage,
            fetcher,
            state: RwLock::new(state),
            install_started: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Paths that are precached and served cache-first.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!("worker {}: {} -> {}", self.config.version, *current, state);
        *current = state;
    }

    /// Move `from` → `to`, or fail if the worker is elsewhere.
    fn transition(&self, from: WorkerState, to: WorkerState, action: &'static str) -> Result<()> {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *current != from {
            return Err(Error::WorkerState {
                state: current.as_str(),
                action,
            });
        }
        *current = to;
        Ok(())
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        Ok(self.config.origin.join(path)?)
    }

    /// Fetch every manifest asset and store it in this version's cache.
    ///
    /// All assets are fetched before anything is stored; one failure fails
    /// the install and leaves the worker `Redundant`. Only the first call
    /// runs; a second one fails at once, even while the first is in flight.
    pub async fn install(&self) -> Result<()> {
        let state = self.state();
        let claimed = state == WorkerState::Installing
            && !self.install_started.swap(true, Ordering::AcqRel);
        if !claimed {
            return Err(Error::WorkerState {
                state: state.as_str(),
                action: "install",
            });
        }

        match self.precache().await {
            Ok(count) => {
                log::info!("installed {} assets into {}", count, self.cache_name);
                self.set_state(WorkerState::Installed);
                Ok(())
            }
            Err(e) => {
                log::warn!("install of {} failed: {}", self.cache_name, e);
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize> {
        let cache = self.storage.open(&self.cache_name).await?;

        let mut fetched = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let url = self.resolve(asset)?;
            let request = Request::new(Method::Get, url);
            let response = self.fetcher.fetch(&request).await?;
            if !response.is_success() {
                return Err(Error::Fetch {
                    url: request.url().to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            fetched.push((request.url().to_string(), response));
        }

        let count = fetched.len();
        for (key, response) in fetched {
            cache.put(&key, response).await?;
        }
        Ok(count)
    }

    /// Delete every cache except this version's and start handling fetches.
    pub async fn activate(&self) -> Result<()> {
        self.transition(WorkerState::Installed, WorkerState::Activating, "activate")?;

        match self.drop_old_caches().await {
            Ok(()) => {
                self.set_state(WorkerState::Active);
                Ok(())
            }
            Err(e) => {
                log::warn!("activation of {} failed: {}", self.cache_name, e);
                self.set_state(WorkerState::Installed);
                Err(e)
            }
        }
    }

    async fn drop_old_caches(&self) -> Result<()> {
        for name in self.storage.keys().await? {
            if name != self.cache_name {
                log::info!("deleting old cache {}", name);
                self.storage.delete(&name).await?;
            }
        }
        Ok(())
    }

    /// Handle a control message. Returns true when it caused activation.
    pub async fn handle_message(&self, message: &WorkerMessage) -> Result<bool> {
        match message {
            WorkerMessage::SkipWaiting if self.state() == WorkerState::Installed => {
                self.activate().await?;
                Ok(true)
            }
            WorkerMessage::SkipWaiting => Ok(false),
            WorkerMessage::Unknown(kind) => {
                log::debug!("ignoring worker message '{}'", kind);
                Ok(false)
            }
        }
    }

    /// Answer a request. `None` means the request is not intercepted and
    /// goes to the network untouched (non-GET, or worker not active).
    pub async fn handle_fetch(&self, request: &Request) -> Option<Response> {
        if !request.is_get() || self.state() != WorkerState::Active {
            return None;
        }
        Some(self.respond(request).await)
    }

    async fn respond(&self, request: &Request) -> Response {
        let path = request.path();

        let cache = match self.storage.open(&self.cache_name).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                log::warn!("cache {} unavailable, using network only: {}", self.cache_name, e);
                None
            }
        };

        if self.asset_paths.contains(path) {
            if let Some(hit) = self.lookup_path(cache.as_deref(), path).await {
                return hit;
            }
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() && is_cacheable_scheme(request.url()) {
                    if let Some(cache) = &cache {
                        if let Err(e) = cache.put(request.url().as_str(), response.clone()).await {
                            log::warn!("could not cache {}: {}", request.url(), e);
                        }
                    }
                }
                return response;
            }
            Err(e) => {
                log::debug!("network failed for {}: {}", request.url(), e);
                if let Some(stale) = self.lookup_path(cache.as_deref(), path).await {
                    return stale;
                }
            }
        }

        Response::not_found()
    }

    /// Cache lookup by path, resolved against the origin.
    async fn lookup_path(&self, cache: Option<&dyn Cache>, path: &str) -> Option<Response> {
        let cache = cache?;
        let key = self.resolve(path).ok()?;
        match cache.match_key(key.as_str()).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("cache lookup for {} failed: {}", key, e);
                None
            }
        }
    }
}

impl fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("cache_name", &self.cache_name)
            .field("origin", &self.config.origin.as_str())
            .field("assets", &self.assets.len())
            .field("state", &self.state())
            .finish()
    }
}
