//! Wire-level records.
//!
//! The same camelCase shape is used by declarative document entries and by
//! remote API payloads. Each entity kind has exactly one `from_record` /
//! `to_record` pair; the declared-config builder and the deployment snapshot
//! both go through it.
//!
//! Unknown fields are ignored (`deny_unknown_fields` is NOT set) so that
//! additions on the remote side do not break listing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ConnectorConfig, Destination, EntityRef, Link, LinkStatus, Source};

/// An available connector type: `{id, name}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRecord {
    pub id: String,
    pub name: String,
}

impl TypeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_definition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Connector type name (e.g. `"GitHub"`).
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub connection_configuration: ConnectorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Source {
    pub fn from_record(r: SourceRecord) -> Self {
        Self {
            id: r.source_id,
            name: r.name,
            definition_id: r.source_definition_id,
            workspace_id: r.workspace_id,
            type_name: r.source_name,
            config: r.connection_configuration,
            tag: r.tag,
        }
    }

    pub fn to_record(&self) -> SourceRecord {
        SourceRecord {
            source_id: self.id.clone(),
            source_definition_id: self.definition_id.clone(),
            workspace_id: self.workspace_id.clone(),
            name: self.name.clone(),
            source_name: self.type_name.clone(),
            connection_configuration: self.config.clone(),
            tag: self.tag.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_definition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Connector type name (e.g. `"Postgres"`).
    #[serde(default)]
    pub destination_name: String,
    #[serde(default)]
    pub connection_configuration: ConnectorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Destination {
    pub fn from_record(r: DestinationRecord) -> Self {
        Self {
            id: r.destination_id,
            name: r.name,
            definition_id: r.destination_definition_id,
            workspace_id: r.workspace_id,
            type_name: r.destination_name,
            config: r.connection_configuration,
            tag: r.tag,
        }
    }

    pub fn to_record(&self) -> DestinationRecord {
        DestinationRecord {
            destination_id: self.id.clone(),
            destination_definition_id: self.definition_id.clone(),
            workspace_id: self.workspace_id.clone(),
            name: self.name.clone(),
            destination_name: self.type_name.clone(),
            connection_configuration: self.config.clone(),
            tag: self.tag.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// Link ("connection") record.
///
/// In a declarative document `sourceName` / `destinationName` hold the
/// *display names* of the referenced source and destination. Remote payloads
/// carry `sourceId` / `destinationId` instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_catalog: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
}

impl Link {
    pub fn from_record(r: LinkRecord) -> Self {
        Self {
            id: r.connection_id,
            name: r.name,
            source: EntityRef {
                id: r.source_id,
                name: r.source_name,
            },
            destination: EntityRef {
                id: r.destination_id,
                name: r.destination_name,
            },
            sync_catalog: r.sync_catalog.filter(|v| !v.is_null()),
            schedule: r.schedule.filter(|v| !v.is_null()),
            prefix: r.prefix,
            namespace_definition: r.namespace_definition,
            status: r.status.unwrap_or_default(),
        }
    }

    pub fn to_record(&self) -> LinkRecord {
        LinkRecord {
            connection_id: self.id.clone(),
            name: self.name.clone(),
            source_id: self.source.id.clone(),
            source_name: self.source.name.clone(),
            destination_id: self.destination.id.clone(),
            destination_name: self.destination.name.clone(),
            prefix: self.prefix.clone(),
            namespace_definition: self.namespace_definition.clone(),
            sync_catalog: self.sync_catalog.clone(),
            schedule: self.schedule.clone(),
            status: Some(self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_record_reads_api_payload() {
        let raw = json!({
            "sourceDefinitionId": "ef69ef6e-aa7f-4af1-a01d-ef775033524e",
            "sourceId": "7d95ec85-47c6-42d4-a7a2-8e5c22c810d2",
            "workspaceId": "f3b9e848-790c-4cdd-a475-5c6bb156dc10",
            "connectionConfiguration": {"access_token": "**********"},
            "name": "apache/superset",
            "sourceName": "GitHub",
            "icon": "ignored"
        });
        let rec: SourceRecord = serde_json::from_value(raw).unwrap();
        let source = Source::from_record(rec);

        assert_eq!(
            source.id.as_deref(),
            Some("7d95ec85-47c6-42d4-a7a2-8e5c22c810d2")
        );
        assert_eq!(source.type_name, "GitHub");
        assert_eq!(source.config["access_token"], json!("**********"));
        assert!(source.tag.is_none());
    }

    #[test]
    fn declared_link_refers_by_name() {
        let raw = json!({
            "name": "superset-to-rds",
            "sourceName": "apache/superset",
            "destinationName": "devrel-rds",
            "schedule": {"units": 24, "timeUnit": "hours"},
            "status": "active"
        });
        let rec: LinkRecord = serde_json::from_value(raw).unwrap();
        let link = Link::from_record(rec);

        assert!(link.id.is_none());
        assert_eq!(link.source, EntityRef::by_name("apache/superset"));
        assert_eq!(link.destination, EntityRef::by_name("devrel-rds"));
        assert!(!link.has_sync_catalog());
        assert_eq!(link.status, LinkStatus::Active);
    }

    #[test]
    fn to_record_omits_absent_ids() {
        let source = Source::new("repo-sync", "GitHub");
        let v = serde_json::to_value(source.to_record()).unwrap();
        assert!(v.get("sourceId").is_none());
        assert_eq!(v["sourceName"], json!("GitHub"));
    }
}
