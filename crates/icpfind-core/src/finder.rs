//! Per-entity and batch drivers tying cache, engine and reconciler together.

use crate::cache::CacheStore;
use crate::client::SearchBackend;
use crate::config::RetrievalConfig;
use crate::engine::{RetrievalEngine, RetrievalObserver, SessionState, StopReason, TracingObserver};
use crate::reconcile::{ReconcileStatus, reconcile};
use crate::types::FilingRecord;
use crate::{Error, Result};
use tracing::{info, warn};

/// Result of querying one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReport {
    /// Entity name as queried (trimmed).
    pub entity: String,
    /// Every record attributed to the entity, cached ones first.
    pub records: Vec<FilingRecord>,
    /// Why retrieval stopped.
    pub stop: StopReason,
    /// Iterations consumed.
    pub iterations: u32,
    /// Records discovered during this run.
    pub new_records: usize,
    /// What happened to the cache file.
    pub cache: ReconcileStatus,
}

/// Outcome of one entity within a batch.
#[derive(Debug)]
pub enum EntityStatus {
    /// Retrieval reached a stop state.
    Succeeded(EntityReport),
    /// Retrieval failed.
    Failed(Error),
    /// Not attempted because an earlier entity exhausted the quota.
    Skipped,
}

/// One line of a batch report.
#[derive(Debug)]
pub struct BatchEntry {
    /// Entity name as given (trimmed).
    pub entity: String,
    /// Its outcome.
    pub status: EntityStatus,
}

/// Ordered per-entity outcomes of [`IcpFinder::find_all`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per input entity, in input order.
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Entities that reached a stop state.
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Succeeded(_)))
    }

    /// Entities whose retrieval failed.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Failed(_)))
    }

    /// Entities never attempted.
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, EntityStatus::Skipped))
    }

    /// Records across all successful entities.
    pub fn total_records(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match &entry.status {
                EntityStatus::Succeeded(report) => report.records.len(),
                _ => 0,
            })
            .sum()
    }

    /// True when every entity succeeded.
    pub fn is_success(&self) -> bool {
        self.succeeded() == self.entries.len()
    }

    fn count(&self, pred: impl Fn(&EntityStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// Retrieves filings for entities and keeps the cache current.
pub struct IcpFinder<B: SearchBackend> {
    backend: B,
    config: RetrievalConfig,
    store: CacheStore,
    observer: Box<dyn RetrievalObserver>,
}

impl<B: SearchBackend> IcpFinder<B> {
    /// Create a finder. Fails if `config` does not validate.
    pub fn new(backend: B, config: RetrievalConfig, store: CacheStore) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            store,
            observer: Box::new(TracingObserver),
        })
    }

    /// Replace the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn RetrievalObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The cache this finder reads and writes.
    pub const fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Retrieve all filings for one entity.
    ///
    /// The cache is loaded fresh, so a batch sees the writes of earlier
    /// entities. A failed run leaves the cache untouched.
    pub async fn find(&self, entity: &str) -> Result<EntityReport> {
        let entity = entity.trim();
        if entity.is_empty() {
            return Err(Error::Config("entity name is empty".into()));
        }

        let mut cache = self.store.load();
        let session = cache
            .get(entity)
            .map_or_else(SessionState::new, |cached| SessionState::seeded(cached));

        let outcome = RetrievalEngine::new(&self.backend, &self.config)
            .with_observer(self.observer.as_ref())
            .run(entity, session)
            .await?;
        let status = reconcile(&self.store, &mut cache, entity, &outcome);

        Ok(EntityReport {
            entity: entity.to_string(),
            stop: outcome.stop,
            iterations: outcome.iterations,
            new_records: outcome.new_records,
            records: outcome.records,
            cache: status,
        })
    }

    /// Retrieve filings for each entity in order.
    ///
    /// A failure is recorded and the batch moves on, except for quota
    /// exhaustion: every later entity is marked [`EntityStatus::Skipped`]
    /// without issuing requests.
    pub async fn find_all<I, S>(&self, entities: I) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BatchReport::default();
        let mut halted = false;

        for entity in entities {
            let entity = entity.as_ref().trim().to_string();
            if halted {
                report.entries.push(BatchEntry {
                    entity,
                    status: EntityStatus::Skipped,
                });
                continue;
            }

            let status = match self.find(&entity).await {
                Ok(found) => EntityStatus::Succeeded(found),
                Err(e) => {
                    if e.halts_batch() {
                        warn!("{e}; skipping remaining entities");
                        halted = true;
                    }
                    EntityStatus::Failed(e)
                },
            };
            report.entries.push(BatchEntry { entity, status });
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Batch finished"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::engine::tests::{ScriptedBackend, coded, fast_config, item, page};
    use crate::types::CacheMap;
    use std::fs;
    use tempfile::TempDir;

    fn finder(backend: ScriptedBackend, dir: &TempDir) -> IcpFinder<ScriptedBackend> {
        IcpFinder::new(
            backend,
            fast_config(),
            CacheStore::new(dir.path().join("cache.json")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_persists_new_records() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![Ok(page(vec![item("a.cn", "L1", "Acme")], 1))]);
        let finder = finder(backend, &dir);

        let report = finder.find("  Acme  ").await.unwrap();

        assert_eq!(report.entity, "Acme");
        assert_eq!(report.cache, ReconcileStatus::Written);
        assert_eq!(finder.store().load()["Acme"], report.records);
    }

    #[tokio::test]
    async fn test_rerun_without_new_data_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let original = r#"{"Acme": [{"domain": "a.com", "licence": "L1"}]}"#;
        fs::write(&path, original).unwrap();

        let backend = ScriptedBackend::new(vec![Ok(page(vec![], 0))]);
        let finder = finder(backend, &dir);
        let report = finder.find("Acme").await.unwrap();

        assert_eq!(report.cache, ReconcileStatus::Unchanged);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].domain, "a.com");
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_blank_entity_is_rejected_without_requests() {
        let dir = TempDir::new().unwrap();
        let finder = finder(ScriptedBackend::default(), &dir);

        let err = finder.find("   ").await.unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(finder.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_entity_does_not_write_or_stop_batch() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![
            Ok(coded("u3015", "bad query")),
            Ok(page(vec![item("b.cn", "L2", "Beta")], 1)),
        ]);
        let finder = finder(backend, &dir);

        let report = finder.find_all(["Alpha", "Beta"]).await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 1);
        assert!(!report.is_success());
        let cache: CacheMap = finder.store().load();
        assert!(!cache.contains_key("Alpha"));
        assert_eq!(cache["Beta"].len(), 1);
    }

    #[tokio::test]
    async fn test_quota_exhaustion_skips_remaining_entities() {
        let dir = TempDir::new().unwrap();
        let backend = ScriptedBackend::new(vec![
            Ok(page(vec![item("a.cn", "L1", "Alpha")], 1)),
            Ok(coded("u3007", "insufficient credits")),
        ]);
        let finder = finder(backend, &dir);

        let report = finder.find_all(vec!["Alpha", "Beta", "Gamma", "Delta"]).await;

        assert_eq!(report.entries.len(), 4);
        assert!(matches!(report.entries[0].status, EntityStatus::Succeeded(_)));
        assert!(matches!(
            report.entries[1].status,
            EntityStatus::Failed(Error::QuotaExhausted { .. })
        ));
        assert!(matches!(report.entries[2].status, EntityStatus::Skipped));
        assert!(matches!(report.entries[3].status, EntityStatus::Skipped));
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.total_records(), 1);
        assert_eq!(finder.backend.requests().len(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = RetrievalConfig {
            page_size: 0,
            ..RetrievalConfig::default()
        };
        let result = IcpFinder::new(
            ScriptedBackend::default(),
            config,
            CacheStore::new(dir.path().join("cache.json")),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
