//! Offline asset cache worker.
//!
//! The worker precaches a fixed manifest of build assets into a cache named
//! after the build version, removes caches of older versions on activation,
//! and then answers GET requests:
//!
//! - manifest paths are served cache-first;
//! - everything else goes to the network, and `200` responses over http(s)
//!   are written back to the cache;
//! - when the network fails, a cached copy for the same path is served;
//! - otherwise a `404` with body `Req: Not found`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pdfsplit::cache::{
//!     Fetcher, MemoryCacheStorage, OfflineWorker, PrecacheManifest, Request, WorkerConfig,
//!     WorkerMessage,
//! };
//!
//! async fn run(fetcher: Arc<dyn Fetcher>) -> pdfsplit::Result<()> {
//!     let manifest = PrecacheManifest::from_path("manifest.json")?;
//!     let config = WorkerConfig::new("https://example.com/", "42", manifest)?;
//!     let worker = OfflineWorker::new(config, Arc::new(MemoryCacheStorage::new()), fetcher);
//!
//!     worker.install().await?;
//!     worker.handle_message(&WorkerMessage::SkipWaiting).await?;
//!
//!     let request = Request::get("https://example.com/index.html")?;
//!     if let Some(response) = worker.handle_fetch(&request).await {
//!         println!("{} ({} bytes)", response.status, response.body.len());
//!     }
//!     Ok(())
//! }
//! ```

mod disk;
mod http;
mod manifest;
mod storage;
mod worker;

pub use disk::{DiskCache, DiskCacheStorage};
pub use http::{is_cacheable_scheme, Fetcher, Method, Request, Response, NOT_FOUND_BODY};
pub use manifest::{PrecacheManifest, EXCLUDED_MARKER};
pub use storage::{Cache, CacheStorage, MemoryCache, MemoryCacheStorage};
pub use worker::{
    cache_name_for, OfflineWorker, WorkerConfig, WorkerMessage, WorkerState, SKIP_WAITING,
};
