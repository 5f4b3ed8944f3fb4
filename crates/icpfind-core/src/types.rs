//! Core data types: filing records and the cache map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Persisted cache contents: entity name to its ordered filing records.
pub type CacheMap = BTreeMap<String, Vec<FilingRecord>>;

const MAIN_LICENCE: &str = "main_licence";
const UNIT: &str = "unit";

/// One confirmed ICP filing: a domain registered under a licence.
///
/// The search backend returns a richer object than the fields the retrieval
/// loop cares about. Everything besides `domain` and `licence` stays as raw
/// JSON in `extra`, so a record written to the cache round-trips unchanged,
/// explicit nulls included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    /// Registered domain; identity key within an entity's record list.
    #[serde(default)]
    pub domain: String,
    /// ICP licence number.
    pub licence: String,
    /// Remaining backend fields (`main_licence`, `update_time`, ...), verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FilingRecord {
    /// Build a minimal record registered under `unit`.
    pub fn new(
        domain: impl Into<String>,
        licence: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        let unit: String = unit.into();
        let mut extra = Map::new();
        extra.insert(MAIN_LICENCE.to_string(), json!({ UNIT: unit }));
        Self {
            domain: domain.into(),
            licence: licence.into(),
            extra,
        }
    }

    /// The entity unit this filing is registered under (`main_licence.unit`),
    /// if present.
    pub fn entity_unit(&self) -> Option<&str> {
        self.extra.get(MAIN_LICENCE)?.get(UNIT)?.as_str()
    }

    /// Extract a filing from one raw search result item.
    ///
    /// The filing lives at `service.http.icp`. Returns `None` when that path
    /// is missing, when the object does not have the expected shape, or when
    /// the domain or licence fails validation. Callers skip such items.
    pub fn from_search_item(item: &Value) -> Option<Self> {
        let icp = item.get("service")?.get("http")?.get("icp")?;
        if !icp.is_object() {
            return None;
        }
        if !matches!(
            icp.get(MAIN_LICENCE),
            None | Some(Value::Null | Value::Object(_))
        ) {
            return None;
        }
        let record: Self = serde_json::from_value(icp.clone()).ok()?;
        record.is_valid().then_some(record)
    }

    /// Domain and licence are both usable.
    pub fn is_valid(&self) -> bool {
        is_valid_domain(&self.domain) && has_licence(&self.licence)
    }
}

/// A domain is usable when it is non-blank and not a bare (dotted) number.
///
/// The backend occasionally reports IP addresses or numeric ids in the domain
/// field; those cannot be attributed to an entity.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.trim().is_empty() {
        return false;
    }
    let digits: String = domain.chars().filter(|c| *c != '.').collect();
    let numeric_only = !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit());
    !numeric_only
}

/// Cached and fetched records must carry a non-blank licence.
pub fn has_licence(licence: &str) -> bool {
    !licence.trim().is_empty()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(icp: Value) -> Value {
        json!({ "service": { "http": { "icp": icp } } })
    }

    #[test]
    fn test_domain_validation() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("123.example.cn"));
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("   "));
        assert!(!is_valid_domain("10.0.0.1"));
        assert!(!is_valid_domain("12345"));
    }

    #[test]
    fn test_extracts_nested_filing() {
        let raw = item(json!({
            "domain": "acme.cn",
            "licence": "京ICP备00000001号-1",
            "main_licence": { "unit": "Acme", "nature": "企业" },
            "update_time": "2024-01-01"
        }));

        let record = FilingRecord::from_search_item(&raw).unwrap();
        assert_eq!(record.domain, "acme.cn");
        assert_eq!(record.licence, "京ICP备00000001号-1");
        assert_eq!(record.entity_unit(), Some("Acme"));
        assert_eq!(record.extra["update_time"], json!("2024-01-01"));
        assert_eq!(record.extra["main_licence"]["nature"], json!("企业"));
    }

    #[test]
    fn test_skips_structurally_broken_items() {
        assert!(FilingRecord::from_search_item(&json!({})).is_none());
        assert!(FilingRecord::from_search_item(&json!({ "service": "http" })).is_none());
        assert!(FilingRecord::from_search_item(&item(json!("not an object"))).is_none());
        assert!(
            FilingRecord::from_search_item(&item(json!({ "domain": 7, "licence": "L" })))
                .is_none()
        );
        assert!(
            FilingRecord::from_search_item(&item(json!({
                "domain": "a.com", "licence": "L", "main_licence": "Acme"
            })))
            .is_none()
        );
    }

    #[test]
    fn test_skips_invalid_fields() {
        let numeric = item(json!({ "domain": "1.2.3.4", "licence": "L1" }));
        let blank_licence = item(json!({ "domain": "a.com", "licence": "  " }));
        let missing_licence = item(json!({ "domain": "a.com" }));

        assert!(FilingRecord::from_search_item(&numeric).is_none());
        assert!(FilingRecord::from_search_item(&blank_licence).is_none());
        assert!(FilingRecord::from_search_item(&missing_licence).is_none());
    }

    #[test]
    fn test_missing_unit_is_not_fatal() {
        let raw = item(json!({ "domain": "a.com", "licence": "L1" }));
        let record = FilingRecord::from_search_item(&raw).unwrap();
        assert_eq!(record.entity_unit(), None);
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let original = json!({
            "domain": "a.com",
            "licence": "L1",
            "main_licence": { "unit": "Acme", "licence": "京ICP备1号" },
            "nested": { "x": [1, 2, 3] }
        });
        let record: FilingRecord = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), original);
    }

    #[test]
    fn test_round_trip_keeps_explicit_nulls() {
        let original = json!({
            "domain": "a.com",
            "licence": "L1",
            "main_licence": null,
            "update_time": null
        });
        let record: FilingRecord = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(record.entity_unit(), None);
        assert_eq!(serde_json::to_value(&record).unwrap(), original);

        let unit_null = json!({ "domain": "b.com", "licence": "L2", "main_licence": { "unit": null } });
        let record: FilingRecord = serde_json::from_value(unit_null.clone()).unwrap();
        assert_eq!(record.entity_unit(), None);
        assert_eq!(serde_json::to_value(&record).unwrap(), unit_null);
    }

    #[test]
    fn test_new_record_carries_unit() {
        let record = FilingRecord::new("a.cn", "L1", "Acme");
        assert_eq!(record.entity_unit(), Some("Acme"));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "domain": "a.cn", "licence": "L1", "main_licence": { "unit": "Acme" } })
        );
    }
}
