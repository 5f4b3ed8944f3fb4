//! The exclusion-driven retrieval loop.
//!
//! The backend caps every answer at one page and offers no cursor for
//! filtered queries. Each iteration therefore re-issues the entity query with
//! `start = 0`, excluding every domain already seen, until the backend runs
//! dry, reports a total that fits in one page, or the iteration budget is
//! spent.
//!
//! A run ends in one of:
//!
//! - [`StopReason::Empty`]: a page came back with no items
//! - [`StopReason::Complete`]: the reported total fits in a page and the page
//!   yielded nothing new (or delivered the whole total)
//! - [`StopReason::Budget`]: `max_iterations` pages were processed
//! - `Err(_)`: transport, protocol or non-retryable API failure
//!
//! Rate-limited pages are retried in place with exponential back-off and do
//! not consume an iteration.

use crate::client::{ApiStatus, SearchBackend, SearchRequest, SearchResponse};
use crate::config::RetrievalConfig;
use crate::query::{EXCLUSION_WARN_THRESHOLD, build_query};
use crate::types::{FilingRecord, has_licence};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Characters of the query quoted when the backend rejects it.
const QUERY_LOG_PREFIX: usize = 200;

/// Why a successful run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// The backend returned an empty page.
    Empty,
    /// The remaining result set fits in one page and was fully seen.
    Complete,
    /// The iteration budget ran out; results may be incomplete.
    Budget,
}

impl StopReason {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Complete => "complete",
            Self::Budget => "budget",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorbed {
    /// Exact match with an unseen domain; appended to the results.
    New,
    /// Exact match with a domain already in the results.
    Known,
    /// Filed under another entity; domain newly excluded.
    Mismatch,
    /// Filed under another entity; domain was already excluded.
    KnownMismatch,
}

/// Per-entity state of one retrieval run.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    known: BTreeSet<String>,
    mismatches: BTreeSet<String>,
    exclusions: BTreeSet<String>,
    records: Vec<FilingRecord>,
    new_records: usize,
}

impl SessionState {
    /// Empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded with an entity's cached records.
    ///
    /// Records without a licence are dropped and only the first record per
    /// domain is kept, so the seeded results already satisfy the dedup
    /// invariant. Seeding never marks the session dirty.
    pub fn seeded(cached: &[FilingRecord]) -> Self {
        let mut session = Self::new();
        for record in cached {
            if !has_licence(&record.licence) || !session.known.insert(record.domain.clone()) {
                continue;
            }
            if !record.domain.trim().is_empty() {
                session.exclusions.insert(record.domain.clone());
            }
            session.records.push(record.clone());
        }
        session
    }

    /// Fold one validated record into the session.
    pub fn absorb(&mut self, entity: &str, record: FilingRecord) -> Absorbed {
        if record.entity_unit() == Some(entity) {
            if self.known.contains(&record.domain) {
                return Absorbed::Known;
            }
            self.known.insert(record.domain.clone());
            self.exclusions.insert(record.domain.clone());
            self.records.push(record);
            self.new_records += 1;
            Absorbed::New
        } else if self.mismatches.insert(record.domain.clone()) {
            self.exclusions.insert(record.domain);
            Absorbed::Mismatch
        } else {
            Absorbed::KnownMismatch
        }
    }

    /// Accumulated results, cached ones first.
    pub fn records(&self) -> &[FilingRecord] {
        &self.records
    }

    /// Domains attributed to the entity.
    pub const fn known_domains(&self) -> &BTreeSet<String> {
        &self.known
    }

    /// Domains seen under a different entity.
    pub const fn mismatch_domains(&self) -> &BTreeSet<String> {
        &self.mismatches
    }

    /// Domains excluded from the next query.
    pub const fn exclusions(&self) -> &BTreeSet<String> {
        &self.exclusions
    }

    /// Records added since seeding.
    pub const fn new_records(&self) -> usize {
        self.new_records
    }

    /// Whether anything was added since seeding.
    pub const fn is_dirty(&self) -> bool {
        self.new_records > 0
    }
}

/// Result of a run that reached a stop state.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOutcome {
    /// Every record attributed to the entity, cached ones first.
    pub records: Vec<FilingRecord>,
    /// Why the loop stopped.
    pub stop: StopReason,
    /// Iterations consumed. Rate-limit retries are not counted.
    pub iterations: u32,
    /// Records discovered during this run.
    pub new_records: usize,
    /// True when `new_records > 0`; gates the cache write.
    pub dirty: bool,
}

/// Progress notifications emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalEvent {
    /// A run is starting.
    Started {
        /// Queried entity.
        entity: String,
        /// Records seeded from the cache.
        seeded: usize,
    },
    /// An iteration is about to send its request.
    IterationStarted {
        /// Queried entity.
        entity: String,
        /// 1-based iteration number.
        iteration: u32,
        /// Iteration budget.
        max_iterations: u32,
        /// Size of the exclusion set in the query.
        excluded: usize,
    },
    /// A successful page arrived.
    PageReceived {
        /// Queried entity.
        entity: String,
        /// 1-based iteration number.
        iteration: u32,
        /// Items on the page.
        items: usize,
        /// Total reported by the backend.
        total: u64,
    },
    /// A page's items were folded into the session.
    BatchProcessed {
        /// Queried entity.
        entity: String,
        /// 1-based iteration number.
        iteration: u32,
        /// New exact matches.
        new: usize,
        /// New mismatched domains.
        mismatched: usize,
        /// Items skipped as malformed or invalid.
        skipped: usize,
        /// Records accumulated so far.
        records: usize,
    },
    /// The page was rate limited and will be retried after `delay`.
    RateLimited {
        /// Queried entity.
        entity: String,
        /// Iteration being retried.
        iteration: u32,
        /// 1-based retry number.
        attempt: u32,
        /// Back-off before the retry.
        delay: Duration,
    },
    /// The exclusion set crossed [`EXCLUSION_WARN_THRESHOLD`].
    LargeExclusionSet {
        /// Queried entity.
        entity: String,
        /// Current exclusion set size.
        size: usize,
    },
    /// The run reached a stop state.
    Stopped {
        /// Queried entity.
        entity: String,
        /// Stop state.
        reason: StopReason,
        /// Iterations consumed.
        iterations: u32,
        /// Records accumulated.
        records: usize,
        /// Records discovered this run.
        new_records: usize,
    },
    /// The run failed.
    Failed {
        /// Queried entity.
        entity: String,
        /// Iteration that failed.
        iteration: u32,
        /// [`Error::category`] of the failure.
        category: &'static str,
        /// Rendered error.
        message: String,
    },
}

/// Receives [`RetrievalEvent`]s as a run progresses.
pub trait RetrievalObserver: Send + Sync {
    /// Handle one event. Must not block for long.
    fn on_event(&self, event: &RetrievalEvent);
}

/// Observer that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RetrievalObserver for TracingObserver {
    fn on_event(&self, event: &RetrievalEvent) {
        match event {
            RetrievalEvent::Started { entity, seeded } => {
                info!("Querying '{entity}' ({seeded} cached record(s))");
            },
            RetrievalEvent::IterationStarted {
                iteration,
                max_iterations,
                excluded,
                ..
            } => {
                debug!("Iteration {iteration}/{max_iterations}, excluding {excluded} domain(s)");
            },
            RetrievalEvent::PageReceived {
                iteration,
                items,
                total,
                ..
            } => {
                debug!("Iteration {iteration}: {items} item(s), total {total}");
            },
            RetrievalEvent::BatchProcessed {
                iteration,
                new,
                mismatched,
                skipped,
                records,
                ..
            } => {
                debug!(
                    new,
                    mismatched, skipped, records, "Iteration {iteration} processed"
                );
            },
            RetrievalEvent::RateLimited {
                iteration,
                attempt,
                delay,
                ..
            } => {
                warn!(
                    "Rate limited on iteration {iteration}; retry {attempt} in {:.1}s",
                    delay.as_secs_f64()
                );
            },
            RetrievalEvent::LargeExclusionSet { entity, size } => {
                warn!(
                    "Exclusion set for '{entity}' reached {size} domains; \
                     the query may be slow or rejected"
                );
            },
            RetrievalEvent::Stopped {
                entity,
                reason,
                iterations,
                records,
                new_records,
            } => match reason {
                StopReason::Budget => warn!(
                    "Stopped '{entity}' after {iterations} iteration(s) at the iteration limit; \
                     results may be incomplete ({records} record(s), {new_records} new)"
                ),
                _ => info!(
                    "Finished '{entity}' ({reason}) after {iterations} iteration(s): \
                     {records} record(s), {new_records} new"
                ),
            },
            RetrievalEvent::Failed {
                entity,
                iteration,
                message,
                ..
            } => {
                error!("Query for '{entity}' failed on iteration {iteration}: {message}");
            },
        }
    }
}

/// Drives the retrieval loop for one entity at a time.
pub struct RetrievalEngine<'a, B: SearchBackend + ?Sized> {
    backend: &'a B,
    config: &'a RetrievalConfig,
    observer: &'a dyn RetrievalObserver,
}

impl<'a, B: SearchBackend + ?Sized> RetrievalEngine<'a, B> {
    /// Engine reporting through [`TracingObserver`].
    pub fn new(backend: &'a B, config: &'a RetrievalConfig) -> Self {
        Self {
            backend,
            config,
            observer: &TracingObserver,
        }
    }

    /// Replace the observer.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn RetrievalObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run the loop for `entity`, starting from `session`.
    ///
    /// `entity` must already be trimmed; it is compared verbatim against each
    /// record's registered unit. Returns `Err` only when the run fails; partial
    /// results of a failed run are discarded.
    pub async fn run(&self, entity: &str, mut session: SessionState) -> Result<RetrievalOutcome> {
        self.observer.on_event(&RetrievalEvent::Started {
            entity: entity.to_string(),
            seeded: session.records().len(),
        });

        let page_size = u64::from(self.config.page_size);
        let mut reported_large = false;
        let mut iteration = 0;

        let stop = loop {
            iteration += 1;

            let excluded = session.exclusions().len();
            if excluded > EXCLUSION_WARN_THRESHOLD && !reported_large {
                reported_large = true;
                self.observer.on_event(&RetrievalEvent::LargeExclusionSet {
                    entity: entity.to_string(),
                    size: excluded,
                });
            }
            let query = build_query(entity, session.exclusions());
            self.observer.on_event(&RetrievalEvent::IterationStarted {
                entity: entity.to_string(),
                iteration,
                max_iterations: self.config.max_iterations,
                excluded,
            });

            let response = self
                .fetch_page(entity, iteration, query)
                .await
                .map_err(|e| self.fail(entity, iteration, e))?;
            let items = response
                .items()
                .map_err(|e| self.fail(entity, iteration, e))?;
            let total = response.total();
            self.observer.on_event(&RetrievalEvent::PageReceived {
                entity: entity.to_string(),
                iteration,
                items: items.len(),
                total,
            });

            if items.is_empty() {
                break StopReason::Empty;
            }

            let (mut new, mut mismatched, mut skipped) = (0, 0, 0);
            for item in items {
                let Some(record) = FilingRecord::from_search_item(item) else {
                    skipped += 1;
                    continue;
                };
                match session.absorb(entity, record) {
                    Absorbed::New => new += 1,
                    Absorbed::Mismatch => mismatched += 1,
                    Absorbed::Known | Absorbed::KnownMismatch => {},
                }
            }
            if skipped > 0 {
                debug!("Skipped {skipped} malformed or invalid item(s)");
            }
            self.observer.on_event(&RetrievalEvent::BatchProcessed {
                entity: entity.to_string(),
                iteration,
                new,
                mismatched,
                skipped,
                records: session.records().len(),
            });

            // A missing or zero total says nothing about completeness.
            let delivered = u64::try_from(items.len()).unwrap_or(u64::MAX);
            if total <= page_size && (new == 0 || (total > 0 && delivered >= total)) {
                break StopReason::Complete;
            }
            if iteration >= self.config.max_iterations {
                break StopReason::Budget;
            }

            tokio::time::sleep(self.config.iteration_delay()).await;
        };

        let outcome = RetrievalOutcome {
            stop,
            iterations: iteration,
            new_records: session.new_records(),
            dirty: session.is_dirty(),
            records: session.records,
        };
        self.observer.on_event(&RetrievalEvent::Stopped {
            entity: entity.to_string(),
            reason: outcome.stop,
            iterations: outcome.iterations,
            records: outcome.records.len(),
            new_records: outcome.new_records,
        });
        Ok(outcome)
    }

    /// Request one page, retrying rate-limited responses in place.
    async fn fetch_page(
        &self,
        entity: &str,
        iteration: u32,
        query: String,
    ) -> Result<SearchResponse> {
        let request = SearchRequest::first_page(query, self.config.page_size);
        let mut retries = 0;

        loop {
            let response = self.backend.search(&request).await?;
            match response.code.status() {
                ApiStatus::Success => return Ok(response),
                ApiStatus::RateLimited => {
                    if retries >= self.config.max_rate_limit_retries {
                        return Err(Error::RateLimited { attempts: retries });
                    }
                    retries += 1;
                    let delay = self.config.rate_limit_delay(retries);
                    self.observer.on_event(&RetrievalEvent::RateLimited {
                        entity: entity.to_string(),
                        iteration,
                        attempt: retries,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                },
                ApiStatus::QuotaExhausted => {
                    return Err(Error::QuotaExhausted {
                        message: response.message().to_string(),
                    });
                },
                ApiStatus::QueryRejected => {
                    let prefix: String = request.query.chars().take(QUERY_LOG_PREFIX).collect();
                    error!("Rejected query ({} chars): {prefix}", request.query.len());
                    return Err(Error::QueryRejected {
                        code: response.code.to_string(),
                        message: response.message().to_string(),
                    });
                },
                ApiStatus::Other => {
                    return Err(Error::Api {
                        code: response.code.to_string(),
                        message: response.message().to_string(),
                    });
                },
            }
        }
    }

    fn fail(&self, entity: &str, iteration: u32, error: Error) -> Error {
        self.observer.on_event(&RetrievalEvent::Failed {
            entity: entity.to_string(),
            iteration,
            category: error.category(),
            message: error.to_string(),
        });
        error
    }
}
