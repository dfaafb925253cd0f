//! Snapshot -> declarative document.
//!
//! Link references are written with both id and name so the dump can be
//! re-applied to another deployment (names) or the same one (ids).

use std::path::Path;

use abt_model::{EntityCollection, Link};
use anyhow::{Context, Result};
use tracing::info;

use crate::{ConnectionEntry, DeclaredDocument};

pub fn dump_yaml(collection: &EntityCollection) -> Result<String> {
    let doc = DeclaredDocument {
        sources: collection.sources.iter().map(|s| s.to_record()).collect(),
        destinations: collection.destinations.iter().map(|d| d.to_record()).collect(),
        connections: collection
            .links
            .iter()
            .map(|l| ConnectionEntry::Link(named_refs(l, collection).to_record()))
            .collect(),
    };
    serde_yaml::to_string(&doc).context("yaml serialize failed")
}

pub fn write_yaml(collection: &EntityCollection, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let yaml = dump_yaml(collection)?;
    std::fs::write(path, yaml)
        .with_context(|| format!("failed to write yaml: {}", path.display()))?;
    info!(
        path = %path.display(),
        sources = collection.sources.len(),
        destinations = collection.destinations.len(),
        links = collection.links.len(),
        "deployment written to yaml"
    );
    Ok(())
}

/// Fill in missing reference names from the snapshot's own entities.
fn named_refs(link: &Link, collection: &EntityCollection) -> Link {
    let mut link = link.clone();
    if link.source.name.is_none() {
        link.source.name = link
            .source
            .id
            .as_deref()
            .and_then(|id| collection.sources.get(id))
            .map(|s| s.name.clone());
    }
    if link.destination.name.is_none() {
        link.destination.name = link
            .destination
            .id
            .as_deref()
            .and_then(|id| collection.destinations.get(id))
            .map(|d| d.name.clone());
    }
    link
}
