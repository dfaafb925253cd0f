//! Field-presence validation of a declarative document.
//!
//! Runs on the merged JSON form, before anything is typed, so every problem in
//! the document is reported at once instead of stopping at the first serde
//! error.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

const SOURCE_REQUIRED: &[&str] = &["name", "sourceName", "connectionConfiguration"];
const DESTINATION_REQUIRED: &[&str] = &["name", "destinationName", "connectionConfiguration"];
const GROUP_REQUIRED: &[&str] = &["sourceTags", "destinationTags", "schedule", "status"];
// `name` is optional on a single link: the builder names it after its endpoints.
const LINK_REQUIRED: &[&str] = &["schedule", "status"];
const LINK_STATUSES: &[&str] = &["active", "inactive", "deprecated"];

/// One finding, addressed by JSON pointer (e.g. `/sources/2/name`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub pointer: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pointer, self.message)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, pointer: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue::new(pointer, message));
    }

    fn warn(&mut self, pointer: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue::new(pointer, message));
    }
}

pub fn validate_document(doc: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(top) = doc.as_object() else {
        report.error("", "document must be a mapping");
        return report;
    };

    let sources = section(top.get("sources"), "/sources", &mut report);
    let destinations = section(top.get("destinations"), "/destinations", &mut report);
    let connections = section(top.get("connections"), "/connections", &mut report);

    for (i, s) in sources.iter().enumerate() {
        require(s, &format!("/sources/{i}"), SOURCE_REQUIRED, &mut report);
    }
    for (i, d) in destinations.iter().enumerate() {
        require(d, &format!("/destinations/{i}"), DESTINATION_REQUIRED, &mut report);
    }

    if !connections.is_empty() && (sources.is_empty() || destinations.is_empty()) {
        report.error(
            "/connections",
            "connections require at least one declared source and one declared destination",
        );
    }

    for (i, c) in connections.iter().enumerate() {
        let ptr = format!("/connections/{i}");
        if is_group(c) {
            require(c, &ptr, GROUP_REQUIRED, &mut report);
        } else {
            require_either(c, &ptr, "sourceName", "sourceId", &mut report);
            require_either(c, &ptr, "destinationName", "destinationId", &mut report);
            require(c, &ptr, LINK_REQUIRED, &mut report);
        }
        if let Some(status) = c.get("status").and_then(Value::as_str) {
            if !LINK_STATUSES.contains(&status) {
                report.error(
                    format!("{ptr}/status"),
                    format!("unknown status '{status}' (expected active, inactive or deprecated)"),
                );
            }
        }
    }

    duplicate_names(sources, "/sources", &mut report);
    duplicate_names(destinations, "/destinations", &mut report);
    duplicate_names(connections, "/connections", &mut report);

    report
}

fn section<'a>(v: Option<&'a Value>, ptr: &str, report: &mut ValidationReport) -> &'a [Value] {
    match v {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            report.error(ptr, "must be a list");
            &[]
        }
    }
}

fn is_group(entry: &Value) -> bool {
    entry.get("sourceTags").is_some() || entry.get("destinationTags").is_some()
}

fn present(entry: &Value, field: &str) -> bool {
    match entry.get(field) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn require(entry: &Value, ptr: &str, fields: &[&str], report: &mut ValidationReport) {
    if !entry.is_object() {
        report.error(ptr, "entry must be a mapping");
        return;
    }
    for field in fields {
        if !present(entry, field) {
            report.error(format!("{ptr}/{field}"), "required field is missing");
        }
    }
}

fn require_either(entry: &Value, ptr: &str, a: &str, b: &str, report: &mut ValidationReport) {
    if entry.is_object() && !present(entry, a) && !present(entry, b) {
        report.error(format!("{ptr}/{a}"), format!("required field is missing (or {b})"));
    }
}

fn duplicate_names(entries: &[Value], ptr: &str, report: &mut ValidationReport) {
    let mut seen = BTreeSet::new();
    for (i, e) in entries.iter().enumerate() {
        let Some(name) = e.get("name").and_then(Value::as_str) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        if !seen.insert(name) {
            report.warn(
                format!("{ptr}/{i}/name"),
                format!("duplicate name '{name}'; the first entry wins on lookup"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_doc() -> Value {
        json!({
            "sources": [
                {"name": "repo", "sourceName": "GitHub", "connectionConfiguration": {}}
            ],
            "destinations": [
                {"name": "dw", "destinationName": "Postgres", "connectionConfiguration": {}}
            ],
            "connections": [
                {"name": "repo-to-dw", "sourceName": "repo", "destinationName": "dw",
                 "schedule": {"units": 24, "timeUnit": "hours"}, "status": "active"},
                {"name": "g", "sourceTags": ["a"], "destinationTags": ["b"],
                 "schedule": {"units": 1, "timeUnit": "hours"}, "status": "inactive"}
            ]
        })
    }

    #[test]
    fn valid_document_passes() {
        let report = validate_document(&valid_doc());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let doc = json!({
            "sources": [{"name": "repo"}],
            "destinations": [{"destinationName": "Postgres", "connectionConfiguration": {}}]
        });
        let report = validate_document(&doc);
        let ptrs: Vec<&str> = report.errors.iter().map(|e| e.pointer.as_str()).collect();
        assert_eq!(
            ptrs,
            vec![
                "/sources/0/sourceName",
                "/sources/0/connectionConfiguration",
                "/destinations/0/name"
            ]
        );
    }

    #[test]
    fn link_may_use_ids_instead_of_names() {
        let mut doc = valid_doc();
        doc["connections"][0] = json!({
            "name": "by-id", "sourceId": "s1", "destinationId": "d1",
            "schedule": {"units": 1, "timeUnit": "hours"}, "status": "active"
        });
        assert!(validate_document(&doc).is_valid());
    }

    #[test]
    fn connections_need_sources_and_destinations() {
        let mut doc = valid_doc();
        doc["destinations"] = json!([]);
        let report = validate_document(&doc);
        assert!(report.errors.iter().any(|e| e.pointer == "/connections"));
    }

    #[test]
    fn unknown_status_and_incomplete_group() {
        let mut doc = valid_doc();
        doc["connections"][1] = json!({"sourceTags": ["a"], "status": "paused"});
        let report = validate_document(&doc);
        let ptrs: Vec<&str> = report.errors.iter().map(|e| e.pointer.as_str()).collect();
        assert!(ptrs.contains(&"/connections/1/destinationTags"));
        assert!(ptrs.contains(&"/connections/1/schedule"));
        assert!(ptrs.contains(&"/connections/1/status"));
    }

    #[test]
    fn duplicate_names_warn() {
        let mut doc = valid_doc();
        doc["sources"]
            .as_array_mut()
            .unwrap()
            .push(json!({"name": "repo", "sourceName": "Slack", "connectionConfiguration": {}}));
        let report = validate_document(&doc);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].pointer, "/sources/1/name");
    }

    #[test]
    fn non_list_section() {
        let report = validate_document(&json!({"sources": {"name": "x"}}));
        assert_eq!(report.errors[0].pointer, "/sources");
    }
}
