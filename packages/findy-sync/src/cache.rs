//! File-backed store of analysis results.
//!
//! The file is a JSON array of [`CacheRecord`]s. In memory records are keyed
//! by [`CacheRecord::cache_key`] and keep file order; re-inserting a key
//! replaces the record in place.

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CacheError, CacheResult};
use crate::types::record::CacheRecord;

/// Default cache location, relative to the working directory.
pub const DEFAULT_CACHE_PATH: &str = ".cache/analyzed_findy_jobs.json";

#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
    records: IndexMap<String, CacheRecord>,
}

impl CacheStore {
    /// An empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: IndexMap::new(),
        }
    }

    /// Load the store, degrading to empty when the file is missing or
    /// malformed.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read(&path) {
            Ok(store) => {
                info!(path = %path.display(), records = store.len(), "Loaded cache");
                store
            }
            Err(CacheError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No cache file, starting empty");
                Self::empty(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache unreadable, starting empty");
                Self::empty(path)
            }
        }
    }

    /// Load the store, failing when the file is missing or malformed.
    pub fn read(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let records: Vec<CacheRecord> = serde_json::from_str(&content)?;

        let mut store = Self::empty(path);
        for record in records {
            store.insert(record);
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a record under its cache key. Records with neither
    /// origin link nor URL are dropped.
    pub fn insert(&mut self, record: CacheRecord) -> bool {
        let Some(key) = record.cache_key().map(str::to_owned) else {
            warn!(title = %record.origin_title, "Dropping cache record without link or URL");
            return false;
        };
        self.records.insert(key, record);
        true
    }

    pub fn get(&self, key: &str) -> Option<&CacheRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &CacheRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write all records atomically: a sibling temp file is written, then
    /// renamed over the cache file.
    pub fn persist(&self) -> CacheResult<()> {
        let io_err = |source: std::io::Error| CacheError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let records: Vec<&CacheRecord> = self.records.values().collect();
        let json = serde_json::to_string_pretty(&records)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        debug!(path = %self.path.display(), records = self.len(), "Cache persisted");
        Ok(())
    }
}
