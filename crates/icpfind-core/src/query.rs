//! Search query construction.
//!
//! Each page request asks for the same entity while excluding every domain the
//! session has already seen. The backend has no stable cursor for this kind of
//! query, so the exclusion clause is what moves the result window forward.

use std::collections::BTreeSet;

/// Exclusion sets above this size produce very long queries that the backend
/// may answer slowly or reject. The engine reports crossing it once per run;
/// the query is still built.
pub const EXCLUSION_WARN_THRESHOLD: usize = 500;

/// Field holding the registered entity unit in the backend's index.
const UNIT_FIELD: &str = "service.http.icp.main_licence.unit";
/// Field whose presence marks a service with ICP filing data.
const ICP_FIELD: &str = "service.http.icp";

/// Quote a value as a search-syntax string literal.
///
/// JSON string escaping covers quotes, backslashes and control characters,
/// which is exactly what the backend's query parser understands.
pub fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

/// Clause selecting services filed under exactly `entity` that carry ICP data.
pub fn base_clause(entity: &str) -> String {
    format!("{UNIT_FIELD}:{} AND _exists_:{ICP_FIELD}", quote(entity))
}

/// Build the full query for `entity`, excluding every domain in `excluded`.
///
/// Domains are emitted in sorted order so identical session states always
/// produce identical queries.
pub fn build_query(entity: &str, excluded: &BTreeSet<String>) -> String {
    let mut query = base_clause(entity);
    if excluded.is_empty() {
        return query;
    }

    let terms: Vec<String> = excluded
        .iter()
        .map(|domain| format!("domain:{}", quote(domain)))
        .collect();
    query.push_str(" AND NOT (");
    query.push_str(&terms.join(" OR "));
    query.push(')');
    query
}
