//! Summarize command implementation

use anyhow::Result;
use icpfind_core::CacheStore;

use crate::output::{OutputFormat, json, text};

/// Execute the summarize command
pub fn execute(store: &CacheStore, format: OutputFormat) -> Result<()> {
    let cache = store.load();
    match format {
        OutputFormat::Text => println!("{}", text::render_cache_summary(&cache, store.path())),
        OutputFormat::Json => json::print(&json::CacheSummary::new(&cache))?,
    }
    Ok(())
}
