//! Declared-config builder.
//!
//! Turns a [`DeclaredDocument`] into an [`EntityCollection`]:
//! - connector definition ids are resolved by type name through a
//!   [`TypeCatalog`] built once per run;
//! - link groups are expanded into concrete links;
//! - a single link declared without a name is named after its endpoints.
//!
//! An unresolvable type name is not an error here: the entity keeps
//! `definition_id = None` and the reconciler refuses to create it.

use std::collections::BTreeMap;

use abt_model::{
    Destination, DestinationRecord, EntityCollection, EntityRef, EntitySet, Link, LinkRecord,
    Source, SourceRecord, TypeRecord,
};
use tracing::warn;

use crate::{ConnectionEntry, DeclaredDocument, LinkGroupRecord};

/// Type name -> definition id. The first record with a given name wins.
#[derive(Clone, Debug, Default)]
pub struct TypeCatalog {
    by_name: BTreeMap<String, String>,
}

impl TypeCatalog {
    pub fn new(records: &[TypeRecord]) -> Self {
        let mut by_name = BTreeMap::new();
        for r in records {
            by_name.entry(r.name.clone()).or_insert_with(|| r.id.clone());
        }
        Self { by_name }
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, type_name: &str) -> Option<&str> {
        self.by_name.get(type_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeclaredConfigBuilder {
    source_types: TypeCatalog,
    destination_types: TypeCatalog,
}

impl DeclaredConfigBuilder {
    pub fn new(source_types: &[TypeRecord], destination_types: &[TypeRecord]) -> Self {
        Self {
            source_types: TypeCatalog::new(source_types),
            destination_types: TypeCatalog::new(destination_types),
        }
    }

    pub fn build(&self, doc: &DeclaredDocument) -> EntityCollection {
        let mut out = EntityCollection::new();

        for rec in &doc.sources {
            out.sources.push(self.build_source(rec.clone()));
        }
        for rec in &doc.destinations {
            out.destinations.push(self.build_destination(rec.clone()));
        }
        for entry in &doc.connections {
            match entry {
                ConnectionEntry::Link(rec) => out.links.push(build_link(rec.clone())),
                ConnectionEntry::Group(group) => {
                    for link in expand_group(group, &out.sources, &out.destinations) {
                        out.links.push(link);
                    }
                }
            }
        }

        out
    }

    pub fn build_source(&self, rec: SourceRecord) -> Source {
        let mut source = Source::from_record(rec);
        if source.definition_id.is_none() {
            source.definition_id = self.source_types.resolve(&source.type_name).map(str::to_string);
            if source.definition_id.is_none() {
                warn!(
                    name = %source.name,
                    type_name = %source.type_name,
                    "no source type with this name; source will not be created"
                );
            }
        }
        source
    }

    pub fn build_destination(&self, rec: DestinationRecord) -> Destination {
        let mut destination = Destination::from_record(rec);
        if destination.definition_id.is_none() {
            destination.definition_id = self
                .destination_types
                .resolve(&destination.type_name)
                .map(str::to_string);
            if destination.definition_id.is_none() {
                warn!(
                    name = %destination.name,
                    type_name = %destination.type_name,
                    "no destination type with this name; destination will not be created"
                );
            }
        }
        destination
    }
}

fn build_link(rec: LinkRecord) -> Link {
    let mut link = Link::from_record(rec);
    if link.name.trim().is_empty() {
        link.name = group_link_name(
            "",
            &endpoint_label(&link.source),
            &endpoint_label(&link.destination),
        );
    }
    link
}

fn endpoint_label(r: &EntityRef) -> String {
    r.name.clone().or_else(|| r.id.clone()).unwrap_or_default()
}

/// Cartesian product of the group's tagged sources and tagged destinations,
/// in declaration order. Generated links never carry an id.
fn expand_group(
    group: &LinkGroupRecord,
    sources: &EntitySet<Source>,
    destinations: &EntitySet<Destination>,
) -> Vec<Link> {
    let tagged = |tag: &Option<String>, wanted: &[String]| {
        tag.as_ref().is_some_and(|t| wanted.iter().any(|w| w == t))
    };

    let group_sources: Vec<&Source> = sources
        .iter()
        .filter(|s| tagged(&s.tag, group.source_tags.as_slice()))
        .collect();
    let group_destinations: Vec<&Destination> = destinations
        .iter()
        .filter(|d| tagged(&d.tag, group.destination_tags.as_slice()))
        .collect();

    if group_sources.is_empty() || group_destinations.is_empty() {
        warn!(
            group = %group.name,
            sources = group_sources.len(),
            destinations = group_destinations.len(),
            "link group matched nothing on one side; no links generated"
        );
    }

    let mut links = Vec::with_capacity(group_sources.len() * group_destinations.len());
    for s in &group_sources {
        for d in &group_destinations {
            links.push(Link {
                id: None,
                name: group_link_name(&group.name, &s.name, &d.name),
                source: EntityRef {
                    id: s.id.clone(),
                    name: Some(s.name.clone()),
                },
                destination: EntityRef {
                    id: d.id.clone(),
                    name: Some(d.name.clone()),
                },
                sync_catalog: group.sync_catalog.clone(),
                schedule: group.schedule.clone(),
                prefix: group.prefix.clone(),
                namespace_definition: group.namespace_definition.clone(),
                status: group.status.unwrap_or_default(),
            });
        }
    }
    links
}

/// Deterministic, so a re-run matches the links it created last time by name.
fn group_link_name(group: &str, source: &str, destination: &str) -> String {
    if group.is_empty() {
        format!("{source} -> {destination}")
    } else {
        format!("{group}: {source} -> {destination}")
    }
}
