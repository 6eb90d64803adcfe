//! Cache storage on the local filesystem.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<md5(cache name)>/cache.json      name record
//! <root>/<md5(cache name)>/<md5(key)>.entry
//! ```
//!
//! An entry file is a 4-byte little-endian metadata length, the JSON
//! metadata, then the body. Entries are written to a temporary file and
//! renamed into place, so a reader sees either the old or the new entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use super::http::Response;
use super::storage::{Cache, CacheStorage};
use crate::error::{Error, Result};

const NAME_RECORD: &str = "cache.json";
const ENTRY_EXT: &str = "entry";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct NameRecord {
    name: String,
    created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    status: u16,
    headers: Vec<(String, String)>,
    stored: DateTime<Utc>,
}

fn hashed(value: &str) -> String {
    format!("{:x}", Md5::digest(value.as_bytes()))
}

fn storage_err(context: &str, path: &Path, err: impl std::fmt::Display) -> Error {
    Error::CacheStorage(format!("{} {}: {}", context, path.display(), err))
}

/// Write `data` to `path` through a uniquely named temporary file.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("tmp-{}-{}", std::process::id(), n));
    tokio::fs::write(&tmp, data)
        .await
        .map_err(|e| storage_err("write", &tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(storage_err("rename", path, e));
    }
    Ok(())
}

/// Cache storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, name: &str) -> PathBuf {
        self.root.join(hashed(name))
    }

    async fn read_name(dir: &Path) -> Option<String> {
        let data = tokio::fs::read(dir.join(NAME_RECORD)).await.ok()?;
        let record: NameRecord = serde_json::from_slice(&data).ok()?;
        Some(record.name)
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let dir = self.cache_dir(name);
        let record_path = dir.join(NAME_RECORD);
        if !tokio::fs::try_exists(&record_path).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| storage_err("create", &dir, e))?;
            let record = NameRecord {
                name: name.to_string(),
                created: Utc::now(),
            };
            let data = serde_json::to_vec_pretty(&record)
                .map_err(|e| storage_err("encode", &record_path, e))?;
            write_atomic(&record_path, &data).await?;
            log::debug!("created cache '{}' at {}", name, dir.display());
        }
        Ok(Arc::new(DiskCache { dir }))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        let record_path = self.cache_dir(name).join(NAME_RECORD);
        tokio::fs::try_exists(&record_path)
            .await
            .map_err(|e| storage_err("stat", &record_path, e))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let dir = self.cache_dir(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err("delete", &dir, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(storage_err("list", &self.root, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err("list", &self.root, e))?
        {
            if let Some(name) = Self::read_name(&entry.path()).await {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// One cache directory.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hashed(key), ENTRY_EXT))
    }

    fn decode(path: &Path, data: &[u8]) -> Result<(EntryMeta, Vec<u8>)> {
        let corrupt = |what: &str| storage_err("read", path, what);
        let len_bytes: [u8; 4] = data
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| corrupt("truncated entry"))?;
        let meta_len = u32::from_le_bytes(len_bytes) as usize;
        let meta_end = 4usize
            .checked_add(meta_len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| corrupt("truncated metadata"))?;
        let meta: EntryMeta = serde_json::from_slice(&data[4..meta_end])
            .map_err(|e| storage_err("decode", path, e))?;
        Ok((meta, data[meta_end..].to_vec()))
    }

    async fn read_entry(path: &Path) -> Result<Option<(EntryMeta, Vec<u8>)>> {
        match tokio::fs::read(path).await {
            Ok(data) => Self::decode(path, &data).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err("read", path, e)),
        }
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn match_key(&self, key: &str) -> Result<Option<Response>> {
        let path = self.entry_path(key);
        Ok(Self::read_entry(&path).await?.map(|(meta, body)| Response {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, key: &str, response: Response) -> Result<()> {
        let path = self.entry_path(key);
        let meta = EntryMeta {
            key: key.to_string(),
            status: response.status,
            headers: response.headers,
            stored: Utc::now(),
        };
        let meta = serde_json::to_vec(&meta).map_err(|e| storage_err("encode", &path, e))?;

        let mut data = Vec::with_capacity(4 + meta.len() + response.body.len());
        data.extend_from_slice(&(meta.len() as u32).to_le_bytes());
        data.extend_from_slice(&meta);
        data.extend_from_slice(&response.body);
        write_atomic(&path, &data).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err("delete", &path, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(storage_err("list", &self.dir, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_err("list", &self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            match Self::read_entry(&path).await {
                Ok(Some((meta, _))) => keys.push(meta.key),
                Ok(None) => {}
                Err(e) => log::warn!("skipping unreadable cache entry: {}", e),
            }
        }
        keys.sort();
        Ok(keys)
    }
}
