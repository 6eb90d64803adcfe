//! Named cache stores and the in-memory backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::http::Response;
use crate::error::Result;

/// One named cache: request URL → stored response.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Look up a stored response.
    async fn match_key(&self, key: &str) -> Result<Option<Response>>;

    /// Store a response, replacing any previous entry for `key`.
    async fn put(&self, key: &str, response: Response) -> Result<()>;

    /// Remove an entry. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Every stored key.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// The set of named caches.
///
/// Backends must tolerate overlapping calls from concurrent fetches.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a cache, creating it if missing.
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>>;

    /// Whether a cache exists.
    async fn has(&self, name: &str) -> Result<bool>;

    /// Delete a cache and all its entries. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Names of all caches.
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Cache held in memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<BTreeMap<String, Response>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn match_key(&self, key: &str) -> Result<Option<Response>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, response: Response) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), response);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// Cache storage held in memory.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<BTreeMap<String, Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let mut caches = self.caches.write().await;
        let cache = caches.entry(name.to_string()).or_default();
        Ok(Arc::clone(cache) as Arc<dyn Cache>)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.caches.read().await.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.caches.write().await.remove(name).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }
}
