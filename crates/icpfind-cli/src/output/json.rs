//! JSON output shapes

use anyhow::Result;
use icpfind_core::{
    BatchReport, CacheMap, EntityStatus, FilingRecord, ReconcileStatus, StopReason,
};
use serde::Serialize;

use super::text::sorted_by_licence;
use crate::commands::search::{DomainMatch, SearchMatches};

/// Print `value` as pretty JSON on stdout.
pub fn print<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Batch query report.
#[derive(Debug, Serialize)]
pub struct QueryReport<'a> {
    entities: Vec<EntityEntry<'a>>,
    summary: QuerySummary,
}

#[derive(Debug, Serialize)]
struct EntityEntry<'a> {
    entity: &'a str,
    status: &'static str,
    stop: Option<StopReason>,
    iterations: Option<u32>,
    new_records: Option<usize>,
    cache: Option<&'a ReconcileStatus>,
    records: Vec<&'a FilingRecord>,
    error: Option<ErrorEntry>,
}

#[derive(Debug, Serialize)]
struct ErrorEntry {
    category: &'static str,
    message: String,
    /// Rerunning later may succeed.
    recoverable: bool,
}

#[derive(Debug, Serialize)]
struct QuerySummary {
    total: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    records: usize,
}

impl<'a> QueryReport<'a> {
    /// Build the JSON view of `report`.
    pub fn new(report: &'a BatchReport) -> Self {
        let entities = report
            .entries
            .iter()
            .map(|entry| {
                let mut out = EntityEntry {
                    entity: &entry.entity,
                    status: "skipped",
                    stop: None,
                    iterations: None,
                    new_records: None,
                    cache: None,
                    records: Vec::new(),
                    error: None,
                };
                match &entry.status {
                    EntityStatus::Succeeded(found) => {
                        out.status = "succeeded";
                        out.stop = Some(found.stop);
                        out.iterations = Some(found.iterations);
                        out.new_records = Some(found.new_records);
                        out.cache = Some(&found.cache);
                        out.records = sorted_by_licence(&found.records);
                    },
                    EntityStatus::Failed(err) => {
                        out.status = "failed";
                        out.error = Some(ErrorEntry {
                            category: err.category(),
                            message: err.to_string(),
                            recoverable: err.is_recoverable(),
                        });
                    },
                    EntityStatus::Skipped => {},
                }
                out
            })
            .collect();

        Self {
            entities,
            summary: QuerySummary {
                total: report.entries.len(),
                succeeded: report.succeeded(),
                failed: report.failed(),
                skipped: report.skipped(),
                records: report.total_records(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct EntityRecords<'a> {
    entity: &'a str,
    records: Vec<&'a FilingRecord>,
}

/// Whole-cache listing.
#[derive(Debug, Serialize)]
pub struct CacheSummary<'a> {
    entities: Vec<EntityRecords<'a>>,
    summary: CacheTotals,
}

#[derive(Debug, Serialize)]
struct CacheTotals {
    entities: usize,
    records: usize,
}

impl<'a> CacheSummary<'a> {
    /// Build the JSON view of `cache`.
    pub fn new(cache: &'a CacheMap) -> Self {
        Self {
            entities: cache
                .iter()
                .map(|(entity, records)| EntityRecords {
                    entity,
                    records: sorted_by_licence(records),
                })
                .collect(),
            summary: CacheTotals {
                entities: cache.len(),
                records: cache.values().map(Vec::len).sum(),
            },
        }
    }
}

/// Cache search results.
#[derive(Debug, Serialize)]
pub struct SearchResults<'a> {
    term: &'a str,
    entities: Vec<EntityRecords<'a>>,
    domains: &'a [DomainMatch<'a>],
}

impl<'a> SearchResults<'a> {
    /// Build the JSON view of `matches`.
    pub fn new(term: &'a str, matches: &'a SearchMatches<'a>) -> Self {
        Self {
            term,
            entities: matches
                .entities
                .iter()
                .map(|(entity, records)| EntityRecords {
                    entity,
                    records: sorted_by_licence(records),
                })
                .collect(),
            domains: &matches.domains,
        }
    }
}
