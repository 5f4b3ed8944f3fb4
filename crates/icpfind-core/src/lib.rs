//! # icpfind-core
//!
//! Core functionality for icpfind - exhaustive retrieval of ICP filing records
//! for a named entity from the Quake search API, with an incremental local
//! cache.
//!
//! The backend returns at most one page per query and offers no cursor for
//! filtered searches. Retrieval therefore repeats the same entity query while
//! excluding every domain already seen, until nothing new comes back.
//!
//! ## Architecture
//!
//! - **Cache**: JSON file mapping entity names to their filings
//!   ([`CacheStore`])
//! - **Query**: search-syntax query with an exclusion clause
//!   ([`query::build_query`])
//! - **Client**: the [`SearchBackend`] seam and its HTTP implementation
//!   ([`QuakeClient`])
//! - **Engine**: the iterative query-and-exclude loop ([`RetrievalEngine`])
//! - **Reconcile**: write-back of new results ([`reconcile::reconcile`])
//! - **Finder**: per-entity and batch drivers ([`IcpFinder`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use icpfind_core::{CacheStore, Config, IcpFinder, QuakeClient};
//!
//! # async fn run() -> icpfind_core::Result<()> {
//! let config = Config::load()?;
//! let token = config.api.token.clone().unwrap_or_default();
//! let client = QuakeClient::new(
//!     &config.api.base_url,
//!     token,
//!     config.retrieval.request_timeout(),
//! )?;
//! let finder = IcpFinder::new(
//!     client,
//!     config.retrieval.clone(),
//!     CacheStore::new(&config.paths.cache_file),
//! )?;
//!
//! let report = finder.find("Example Technology Co., Ltd.").await?;
//! println!("{} filing(s), stopped: {}", report.records.len(), report.stop);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result<T, Error>`]. A run that returns
//! `Ok` with no records means the entity has no filings; a run that returns
//! `Err` means the entity could not be queried:
//!
//! ```rust
//! use icpfind_core::Error;
//!
//! fn describe(err: &Error) -> &'static str {
//!     match err {
//!         Error::QuotaExhausted { .. } => "out of credits",
//!         e if e.is_recoverable() => "try again later",
//!         _ => "failed",
//!     }
//! }
//!
//! assert_eq!(describe(&Error::Timeout("60s".into())), "try again later");
//! ```

/// Persistent entity → filings cache
pub mod cache;
/// Search backend seam and HTTP client
pub mod client;
/// Configuration file and retrieval knobs
pub mod config;
/// The exclusion-driven retrieval loop
pub mod engine;
/// Error types and result aliases
pub mod error;
/// Per-entity and batch drivers
pub mod finder;
/// Search query construction
pub mod query;
/// Cache write-back after a run
pub mod reconcile;
/// Filing records and the cache map
pub mod types;

pub use cache::CacheStore;
pub use client::{ApiCode, ApiStatus, QuakeClient, SearchBackend, SearchRequest, SearchResponse};
pub use config::{ApiConfig, Config, PathsConfig, RetrievalConfig};
pub use engine::{
    RetrievalEngine, RetrievalEvent, RetrievalObserver, RetrievalOutcome, SessionState,
    StopReason, TracingObserver,
};
pub use error::{Error, Result};
pub use finder::{BatchEntry, BatchReport, EntityReport, EntityStatus, IcpFinder};
pub use reconcile::ReconcileStatus;
pub use types::{CacheMap, FilingRecord};
