//! Persistent JSON cache of filings, keyed by entity name.
//!
//! Loading never fails: a missing, empty or corrupt file is an empty cache,
//! and individual malformed entries are dropped with a warning while the rest
//! are kept. Saving replaces the whole file through a temp file and rename.

use crate::types::{CacheMap, FilingRecord, has_licence};
use crate::{Error, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File-backed store for the entity → filings map.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// Create a store for the given cache file. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache, treating every failure as an empty cache.
    pub fn load(&self) -> CacheMap {
        if !self.path.exists() {
            info!(
                "Cache file {} does not exist yet; starting empty",
                self.path.display()
            );
            return CacheMap::new();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "Failed to read cache file {}: {e}; starting empty",
                    self.path.display()
                );
                return CacheMap::new();
            },
        };

        if content.trim().is_empty() {
            info!("Cache file {} is empty", self.path.display());
            return CacheMap::new();
        }

        let map = match parse_cache(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "Cache file {} is corrupt ({e}); starting empty",
                    self.path.display()
                );
                return CacheMap::new();
            },
        };

        debug!(
            entities = map.len(),
            "Loaded cache from {}",
            self.path.display()
        );
        map
    }

    /// Overwrite the cache file with `map`.
    ///
    /// Output is pretty-printed UTF-8 JSON; non-ASCII entity names and
    /// licences are written as-is, not `\u`-escaped.
    pub fn save(&self, map: &CacheMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create cache directory: {e}")))?;
        }

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| Error::Storage(format!("Failed to serialize cache: {e}")))?;

        let tmp_path = tmp_path_for(&self.path);
        fs::write(&tmp_path, json)
            .map_err(|e| Error::Storage(format!("Failed to write cache: {e}")))?;

        #[cfg(target_os = "windows")]
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| Error::Storage(format!("Failed to remove existing cache: {e}")))?;
        }

        fs::rename(&tmp_path, &self.path)
            .map_err(|e| Error::Storage(format!("Failed to commit cache: {e}")))?;

        debug!(entities = map.len(), "Saved cache to {}", self.path.display());
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Parse cache text, dropping malformed entries instead of failing.
///
/// Errors only when the document is not JSON or not a top-level object.
fn parse_cache(content: &str) -> Result<CacheMap> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Object(entries) = value else {
        return Err(Error::Serialization(
            "top-level value is not an object".into(),
        ));
    };

    let mut map = CacheMap::new();
    for (entity, records) in entries {
        let Value::Array(items) = records else {
            warn!("Cache entry for '{entity}' is not a list; ignoring it");
            continue;
        };

        let total = items.len();
        let kept: Vec<FilingRecord> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<FilingRecord>(item).ok())
            .filter(|record| has_licence(&record.licence))
            .collect();

        if kept.len() < total {
            warn!(
                "Dropped {} malformed record(s) from cache entry '{entity}'",
                total - kept.len()
            );
        }
        map.insert(entity, kept);
    }
    Ok(map)
}
