use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collection::{EntityCollection, EntitySet};

/// Open-ended connector configuration.
///
/// The set of connector types and their fields is defined by the deployment,
/// so this stays a loosely-typed string-keyed map.
pub type ConnectorConfig = serde_json::Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Source,
    Destination,
    Link,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Source => "source",
            EntityKind::Destination => "destination",
            EntityKind::Link => "link",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link status as reported by the deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    #[default]
    Active,
    Inactive,
    Deprecated,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Active => "active",
            LinkStatus::Inactive => "inactive",
            LinkStatus::Deprecated => "deprecated",
        }
    }
}

// ---------------------------------------------------------------------------
// Entity trait
// ---------------------------------------------------------------------------

/// Identity accessors common to every entity kind.
///
/// `set_of` / `set_of_mut` select the per-kind set inside an
/// [`EntityCollection`], which lets callers write one generic routine over
/// all three kinds.
pub trait Entity: Clone + fmt::Debug {
    const KIND: EntityKind;

    fn id(&self) -> Option<&str>;
    fn name(&self) -> &str;
    fn set_id(&mut self, id: String);

    fn set_of(collection: &EntityCollection) -> &EntitySet<Self>;
    fn set_of_mut(collection: &mut EntityCollection) -> &mut EntitySet<Self>;
}

// ---------------------------------------------------------------------------
// Source / Destination
// ---------------------------------------------------------------------------

/// A configured data origin.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Source {
    pub id: Option<String>,
    pub name: String,
    /// Connector implementation id. `None` when the type name could not be
    /// resolved against the catalog; such a source is never created.
    pub definition_id: Option<String>,
    pub workspace_id: Option<String>,
    /// Connector type, e.g. `"GitHub"`.
    pub type_name: String,
    pub config: ConnectorConfig,
    /// Optional grouping label used by link-group expansion.
    pub tag: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }
}

impl Entity for Source {
    const KIND: EntityKind = EntityKind::Source;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set_of(collection: &EntityCollection) -> &EntitySet<Self> {
        &collection.sources
    }

    fn set_of_mut(collection: &mut EntityCollection) -> &mut EntitySet<Self> {
        &mut collection.sources
    }
}

/// A configured data sink. Same shape as [`Source`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Destination {
    pub id: Option<String>,
    pub name: String,
    pub definition_id: Option<String>,
    pub workspace_id: Option<String>,
    /// Connector type, e.g. `"Postgres"`.
    pub type_name: String,
    pub config: ConnectorConfig,
    pub tag: Option<String>,
}

impl Destination {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }
}

impl Entity for Destination {
    const KIND: EntityKind = EntityKind::Destination;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set_of(collection: &EntityCollection) -> &EntitySet<Self> {
        &collection.destinations
    }

    fn set_of_mut(collection: &mut EntityCollection) -> &mut EntitySet<Self> {
        &mut collection.destinations
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// Reference from a link to a source or destination, by id and/or by name.
///
/// An id, when present, is used as-is. Otherwise the name is resolved against
/// the working snapshot at reconcile time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl EntityRef {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Resolve to a concrete id against `set`. The id wins when present.
    pub fn resolve<E: Entity>(&self, set: &EntitySet<E>) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        let name = self.name.as_deref()?;
        set.resolve_id_by_name(name).map(str::to_string)
    }

    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match (&self.id, &self.name) {
            (Some(id), Some(name)) => format!("{name} ({id})"),
            (Some(id), None) => id.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => "<unset>".to_string(),
        }
    }
}

/// A configured sync from one source to one destination.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Link {
    pub id: Option<String>,
    pub name: String,
    pub source: EntityRef,
    pub destination: EntityRef,
    /// Which streams sync and how. `None` means "not declared".
    pub sync_catalog: Option<Value>,
    pub schedule: Option<Value>,
    pub prefix: Option<String>,
    pub namespace_definition: Option<String>,
    pub status: LinkStatus,
}

impl Link {
    pub fn new(name: impl Into<String>, source: EntityRef, destination: EntityRef) -> Self {
        Self {
            name: name.into(),
            source,
            destination,
            ..Self::default()
        }
    }

    /// True when the link carries a non-empty stream catalog.
    ///
    /// `null`, `{}`, `[]` and `{"streams": []}` all count as empty.
    pub fn has_sync_catalog(&self) -> bool {
        match &self.sync_catalog {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => match map.get("streams") {
                Some(Value::Array(streams)) => !streams.is_empty(),
                Some(Value::Null) => false,
                Some(_) => true,
                None => !map.is_empty(),
            },
            Some(_) => true,
        }
    }
}

impl Entity for Link {
    const KIND: EntityKind = EntityKind::Link;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set_of(collection: &EntityCollection) -> &EntitySet<Self> {
        &collection.links
    }

    fn set_of_mut(collection: &mut EntityCollection) -> &mut EntitySet<Self> {
        &mut collection.links
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_catalog_shapes_are_not_a_catalog() {
        let mut link = Link::new("l", EntityRef::by_name("s"), EntityRef::by_name("d"));
        assert!(!link.has_sync_catalog());

        for empty in [json!(null), json!({}), json!([]), json!({"streams": []})] {
            link.sync_catalog = Some(empty);
            assert!(!link.has_sync_catalog());
        }

        link.sync_catalog = Some(json!({"streams": [{"stream": {"name": "issues"}}]}));
        assert!(link.has_sync_catalog());
    }

    #[test]
    fn link_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(LinkStatus::Deprecated).unwrap(),
            json!("deprecated")
        );
        let parsed: LinkStatus = serde_json::from_value(json!("inactive")).unwrap();
        assert_eq!(parsed, LinkStatus::Inactive);
        assert!(serde_json::from_value::<LinkStatus>(json!("paused")).is_err());
    }

    #[test]
    fn entity_ref_describe() {
        assert_eq!(EntityRef::by_name("repo").describe(), "repo");
        assert_eq!(EntityRef::by_id("abc").describe(), "abc");
        assert_eq!(EntityRef::default().describe(), "<unset>");
    }
}
