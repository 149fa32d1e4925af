//! File-backed render cache.
//!
//! Entries live at `[prefix/]<name>/<cacheId>/<hash>.<ext>`, where `hash`
//! is a SHA-256 digest of the canonical JSON form of the stable render
//! parameters. Keys are identical across process restarts for identical
//! logical parameters, independent of data key order.
//!
//! ```rust,no_run
//! use html2raster_api::cache::CacheStore;
//!
//! # fn main() -> html2raster_api::Result<()> {
//! let cache = CacheStore::local("storage/raster");
//!
//! // Drop every entry of one template's default bucket
//! cache.forget(["cards.og"], ["_"])?;
//!
//! // Drop everything
//! cache.flush()?;
//! # Ok(())
//! # }
//! ```
//!
//! Concurrent misses for the same key are not deduplicated; both writers
//! store identical bytes and the last rename wins.

pub mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::params::{DEFAULT_CACHE_ID, DataMap, ImageType, ParameterSet};

pub use store::{FileStore, LocalFileStore};

/// The parameter subset a cache entry is keyed by.
///
/// Excludes everything that does not change the rendered bytes (the cache
/// flags, the filename override, the data resolver itself) and the name
/// and bucket, which are part of the entry path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheParams {
    /// Resolved template data.
    pub data: DataMap,
    /// Requested width.
    pub width: Option<u32>,
    /// Requested height.
    pub height: Option<u32>,
    /// Font scaling basis.
    pub basis: Option<u32>,
    /// Device scale factor.
    pub scale: u32,
    /// Output format.
    #[serde(rename = "type")]
    pub image_type: ImageType,
    /// Transparent background.
    pub transparent: bool,
}

impl CacheParams {
    /// Key parameters for `params` rendered with resolved `data`.
    pub fn new(params: &ParameterSet, data: DataMap) -> Self {
        Self {
            data,
            width: params.width(),
            height: params.height(),
            basis: params.basis(),
            scale: params.scale(),
            image_type: params.image_type(),
            transparent: params.transparent(),
        }
    }

    /// Hex SHA-256 of the canonical serialization.
    pub fn digest(&self) -> Result<String> {
        let value = canonicalize(serde_json::to_value(self).map_err(std::io::Error::from)?);
        let bytes = serde_json::to_vec(&value).map_err(std::io::Error::from)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// Sort object keys recursively so serialization never depends on
/// insertion order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Content-addressed render cache over a [`FileStore`].
#[derive(Clone)]
pub struct CacheStore {
    files: Arc<dyn FileStore>,
    prefix: Option<String>,
    ttl: Option<Duration>,
}

impl CacheStore {
    /// Cache over any file store.
    pub fn new<S: FileStore + 'static>(files: S) -> Self {
        Self {
            files: Arc::new(files),
            prefix: None,
            ttl: None,
        }
    }

    /// Cache in a local directory.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(LocalFileStore::new(root))
    }

    /// Keep all entries under a root-relative subdirectory.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_matches('/').to_string();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Treat entries older than `ttl` as absent.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Configured TTL.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Store-relative path of the entry for `(name, id, params)`.
    pub fn path_for(&self, name: &str, id: &str, params: &CacheParams) -> Result<String> {
        Ok(format!(
            "{}/{}.{}",
            self.directory(name, id),
            params.digest()?,
            params.image_type.extension()
        ))
    }

    /// Cached bytes, or `None` on a miss or an expired entry.
    pub fn get(&self, name: &str, id: &str, params: &CacheParams) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name, id, params)?;

        if !self.files.exists(&path)? {
            log::trace!("Cache miss: {}", path);
            return Ok(None);
        }

        if let Some(ttl) = self.ttl {
            let expired = self
                .files
                .modified(&path)?
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age > ttl);
            if expired {
                log::debug!("Cache entry expired: {}", path);
                self.files.delete(&path)?;
                return Ok(None);
            }
        }

        match self.files.get(&path) {
            Ok(bytes) => {
                log::trace!("Cache hit: {} ({} bytes)", path, bytes.len());
                Ok(Some(bytes))
            }
            // Removed between the existence check and the read
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store rendered bytes, creating directories as needed.
    pub fn put(&self, name: &str, id: &str, params: &CacheParams, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(name, id, params)?;
        let directory = self.directory(name, id);
        if !self.files.exists(&directory)? {
            self.files.make_directory(&directory)?;
        }
        self.files.put(&path, bytes)?;
        log::trace!("Cached {} bytes at {}", bytes.len(), path);
        Ok(())
    }

    /// Delete every entry for each `(name, id)` combination.
    pub fn forget<N, I>(&self, names: N, ids: I) -> Result<()>
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let ids: Vec<I::Item> = ids.into_iter().collect();
        for name in names {
            for id in &ids {
                let directory = self.directory(name.as_ref(), id.as_ref());
                log::debug!("Forgetting cache directory {}", directory);
                self.files.delete_directory(&directory)?;
            }
        }
        Ok(())
    }

    /// [`forget`](Self::forget) in the default `_` bucket.
    pub fn forget_default<N>(&self, names: N) -> Result<()>
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        self.forget(names, [DEFAULT_CACHE_ID])
    }

    /// Delete every cached entry.
    pub fn flush(&self) -> Result<()> {
        let root = self.prefix.as_deref().unwrap_or_default();
        for directory in self.files.directories(root)? {
            self.files.delete_directory(&directory)?;
        }
        log::debug!("Flushed render cache");
        Ok(())
    }

    fn directory(&self, name: &str, id: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}/{}", prefix, name, id),
            None => format!("{}/{}", name, id),
        }
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .finish()
    }
}
