//! Text output formatting

use std::path::Path;

use colored::Colorize;
use icpfind_core::{BatchReport, CacheMap, EntityReport, EntityStatus, FilingRecord, ReconcileStatus};

use crate::commands::search::SearchMatches;

/// Records ordered by licence, then domain.
pub fn sorted_by_licence(records: &[FilingRecord]) -> Vec<&FilingRecord> {
    let mut sorted: Vec<&FilingRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        a.licence
            .cmp(&b.licence)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    sorted
}

fn record_lines(records: &[FilingRecord], lines: &mut Vec<String>) {
    let sorted = sorted_by_licence(records);
    let width = sorted
        .iter()
        .map(|r| r.domain.chars().count())
        .max()
        .unwrap_or(0);
    for record in sorted {
        let domain = format!("{:<width$}", record.domain);
        lines.push(format!("  {}  {}", domain.cyan(), record.licence));
    }
}

fn entity_header(entity: &str, count: usize) -> String {
    format!("{} ({count} filing(s))", entity.bold())
}

fn cache_note(status: &ReconcileStatus) -> String {
    match status {
        ReconcileStatus::Unchanged => "cache unchanged".to_string(),
        ReconcileStatus::Written => "cache updated".to_string(),
        ReconcileStatus::WriteFailed(msg) => format!("cache write failed: {msg}")
            .yellow()
            .to_string(),
    }
}

fn entity_section(report: &EntityReport, lines: &mut Vec<String>) {
    lines.push(format!(
        "{}, {} new",
        entity_header(&report.entity, report.records.len()),
        report.new_records
    ));
    if report.records.is_empty() {
        lines.push(format!("  {}", "no filings found".dimmed()));
    } else {
        record_lines(&report.records, lines);
    }
    lines.push(
        format!(
            "  stopped: {} after {} iteration(s); {}",
            report.stop,
            report.iterations,
            cache_note(&report.cache)
        )
        .dimmed()
        .to_string(),
    );
}

/// Per-entity listings followed by batch statistics.
pub fn render_query_report(report: &BatchReport) -> String {
    let mut lines = Vec::new();
    for entry in &report.entries {
        match &entry.status {
            EntityStatus::Succeeded(found) => entity_section(found, &mut lines),
            EntityStatus::Failed(err) => {
                let hint = if err.is_recoverable() {
                    format!(" {}", "(transient, retry later)".dimmed())
                } else {
                    String::new()
                };
                lines.push(format!("{} {}: {err}{hint}", "✗".red(), entry.entity.bold()));
            },
            EntityStatus::Skipped => {
                lines.push(format!(
                    "{} {}: skipped (query quota exhausted)",
                    "-".yellow(),
                    entry.entity.bold()
                ));
            },
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "Summary: {} entities, {} succeeded, {} failed, {} skipped, {} filing(s)",
        report.entries.len(),
        report.succeeded().to_string().green(),
        report.failed().to_string().red(),
        report.skipped().to_string().yellow(),
        report.total_records()
    ));
    lines.join("\n")
}

/// Every cached entity in name order, then totals.
pub fn render_cache_summary(cache: &CacheMap, path: &Path) -> String {
    if cache.is_empty() {
        return format!("Cache {} is empty.", path.display());
    }

    let mut lines = Vec::new();
    for (entity, records) in cache {
        lines.push(entity_header(entity, records.len()));
        record_lines(records, &mut lines);
        lines.push(String::new());
    }
    let total: usize = cache.values().map(Vec::len).sum();
    lines.push(format!(
        "{} entities, {total} filing(s) in {}",
        cache.len(),
        path.display()
    ));
    lines.join("\n")
}

/// Matching entities with their filings, then matching domains.
pub fn render_search(term: &str, matches: &SearchMatches<'_>) -> String {
    if matches.is_empty() {
        return format!("No cached entities or domains match '{term}'.");
    }

    let mut lines = Vec::new();
    if !matches.entities.is_empty() {
        lines.push(format!("Entities matching '{term}':").green().to_string());
        for (entity, records) in &matches.entities {
            lines.push(entity_header(entity, records.len()));
            record_lines(records, &mut lines);
        }
        lines.push(String::new());
    }
    if !matches.domains.is_empty() {
        lines.push(format!("Domains matching '{term}':").green().to_string());
        let width = matches
            .domains
            .iter()
            .map(|m| m.domain.chars().count())
            .max()
            .unwrap_or(0);
        for m in &matches.domains {
            let domain = format!("{:<width$}", m.domain);
            lines.push(format!("  {}  {}  ({})", domain.cyan(), m.licence, m.entity));
        }
    }
    lines.join("\n").trim_end().to_string()
}
