use abt_model::{DestinationRecord, LinkRecord, LinkStatus, SourceRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed form of a declarative document.
///
/// Top-level keys other than these three are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredDocument {
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub destinations: Vec<DestinationRecord>,
    #[serde(default)]
    pub connections: Vec<ConnectionEntry>,
}

/// One entry under `connections`: a single link, or a link-group shorthand.
///
/// An entry is a group when it carries both `sourceTags` and
/// `destinationTags`; anything else is read as a link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionEntry {
    Group(LinkGroupRecord),
    Link(LinkRecord),
}

/// Link-group shorthand: one link per (tagged source, tagged destination).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkGroupRecord {
    #[serde(default)]
    pub name: String,
    pub source_tags: Vec<String>,
    pub destination_tags: Vec<String>,
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
