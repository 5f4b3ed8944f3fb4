//! Merge a finished retrieval run back into the persistent cache.

use crate::cache::CacheStore;
use crate::engine::RetrievalOutcome;
use crate::types::CacheMap;
use serde::Serialize;
use tracing::{debug, error, info};

/// What reconciliation did with the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ReconcileStatus {
    /// Nothing new was found; the file was not touched.
    Unchanged,
    /// The entity's entry was replaced and the file rewritten.
    Written,
    /// Writing failed; the run's records are still valid.
    WriteFailed(String),
}

impl ReconcileStatus {
    /// Whether the cache file now reflects the run.
    pub const fn is_persisted(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Written)
    }
}

/// Replace `entity`'s cache entry with the run's records, if the run found
/// anything new.
///
/// The entry is replaced wholesale; the records already start with every
/// valid cached record. A clean run never writes. Write failures are logged
/// and reported in the status, never returned as errors.
pub fn reconcile(
    store: &CacheStore,
    cache: &mut CacheMap,
    entity: &str,
    outcome: &RetrievalOutcome,
) -> ReconcileStatus {
    if !outcome.dirty {
        debug!("No new records for '{entity}'; cache left untouched");
        return ReconcileStatus::Unchanged;
    }

    cache.insert(entity.to_string(), outcome.records.clone());
    match store.save(cache) {
        Ok(()) => {
            info!(
                "Cached {} record(s) for '{entity}' ({} new) in {}",
                outcome.records.len(),
                outcome.new_records,
                store.path().display()
            );
            ReconcileStatus::Written
        },
        Err(e) => {
            error!("Failed to update cache for '{entity}': {e}");
            ReconcileStatus::WriteFailed(e.to_string())
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::StopReason;
    use crate::types::FilingRecord;
    use std::fs;
    use tempfile::TempDir;

    fn outcome(records: Vec<FilingRecord>, new_records: usize) -> RetrievalOutcome {
        RetrievalOutcome {
            records,
            stop: StopReason::Complete,
            iterations: 1,
            new_records,
            dirty: new_records > 0,
        }
    }

    #[test]
    fn test_clean_run_does_not_write() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));
        let mut cache = CacheMap::new();

        let status = reconcile(&store, &mut cache, "Acme", &outcome(vec![], 0));

        assert_eq!(status, ReconcileStatus::Unchanged);
        assert!(cache.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_superset_replaces_entry() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().join("cache.json"));
        let old = FilingRecord::new("a.com", "L1", "Acme");
        let new = FilingRecord::new("b.com", "L2", "Acme");
        let mut cache = CacheMap::from([
            ("Acme".to_string(), vec![old.clone()]),
            ("Other".to_string(), vec![FilingRecord::new("o.com", "L9", "Other")]),
        ]);

        let status = reconcile(
            &store,
            &mut cache,
            "Acme",
            &outcome(vec![old.clone(), new.clone()], 1),
        );

        assert_eq!(status, ReconcileStatus::Written);
        let persisted = store.load();
        assert_eq!(persisted["Acme"], vec![old, new]);
        assert_eq!(persisted["Other"].len(), 1);
        assert_eq!(persisted, cache);
    }

    #[test]
    fn test_write_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let occupied = dir.path().join("cache.json");
        fs::create_dir(&occupied).unwrap();
        let store = CacheStore::new(occupied);
        let mut cache = CacheMap::new();

        let status = reconcile(
            &store,
            &mut cache,
            "Acme",
            &outcome(vec![FilingRecord::new("a.com", "L1", "Acme")], 1),
        );

        assert!(matches!(status, ReconcileStatus::WriteFailed(_)));
        assert!(!status.is_persisted());
    }
}
