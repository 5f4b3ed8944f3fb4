//! Search command implementation

use anyhow::Result;
use icpfind_core::{CacheMap, CacheStore, FilingRecord};
use serde::Serialize;

use crate::output::{OutputFormat, json, text};

/// A cached filing whose domain matched the search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainMatch<'a> {
    /// Matching domain.
    pub domain: &'a str,
    /// Its licence.
    pub licence: &'a str,
    /// Entity the filing is cached under.
    pub entity: &'a str,
}

/// Everything in the cache that matched a term.
#[derive(Debug, Default)]
pub struct SearchMatches<'a> {
    /// Entities whose name contains the term, with all their filings.
    pub entities: Vec<(&'a str, &'a [FilingRecord])>,
    /// Filings whose domain contains the term, in entity then licence order.
    pub domains: Vec<DomainMatch<'a>>,
}

impl SearchMatches<'_> {
    /// True when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.domains.is_empty()
    }
}

/// Case-insensitive substring search over entity names and domains.
pub fn find_matches<'a>(cache: &'a CacheMap, term: &str) -> SearchMatches<'a> {
    let needle = term.to_lowercase();
    let mut matches = SearchMatches::default();

    for (entity, records) in cache {
        if entity.to_lowercase().contains(&needle) {
            matches.entities.push((entity.as_str(), records.as_slice()));
        }
        for record in text::sorted_by_licence(records) {
            if record.domain.to_lowercase().contains(&needle) {
                matches.domains.push(DomainMatch {
                    domain: &record.domain,
                    licence: &record.licence,
                    entity,
                });
            }
        }
    }
    matches
}

/// Execute the search command
pub fn execute(store: &CacheStore, term: &str, format: OutputFormat) -> Result<()> {
    let cache = store.load();
    let matches = find_matches(&cache, term);

    match format {
        OutputFormat::Text => println!("{}", text::render_search(term, &matches)),
        OutputFormat::Json => json::print(&json::SearchResults::new(term, &matches))?,
    }
    Ok(())
}
