use std::collections::BTreeMap;

use crate::{Destination, Entity, EntityKind, Link, Source};

// ---------------------------------------------------------------------------
// EntitySet
// ---------------------------------------------------------------------------

/// Ordered set of entities of one kind with id and name indexes.
///
/// Entries keep insertion order (declaration order for declared config,
/// listing order for a snapshot). When two entries share a name or an id, the
/// index points at the first one: lookups resolve to the first match.
#[derive(Clone, Debug)]
pub struct EntitySet<E> {
    entries: Vec<E>,
    by_id: BTreeMap<String, usize>,
    by_name: BTreeMap<String, usize>,
}

impl<E> Default for EntitySet<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_id: BTreeMap::new(),
            by_name: BTreeMap::new(),
        }
    }
}

impl<E: Entity> EntitySet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    /// Append without de-duplication.
    pub fn push(&mut self, entity: E) {
        let idx = self.entries.len();
        self.index(idx, &entity);
        self.entries.push(entity);
    }

    /// Replace the entry carrying the same id, or append when there is none.
    ///
    /// Returns the replaced entry.
    pub fn upsert(&mut self, entity: E) -> Option<E> {
        let existing = entity.id().and_then(|id| self.by_id.get(id).copied());
        match existing {
            Some(idx) => {
                let old = std::mem::replace(&mut self.entries[idx], entity);
                self.reindex();
                Some(old)
            }
            None => {
                self.push(entity);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<E> {
        let idx = self.by_id.get(id).copied()?;
        let old = self.entries.remove(idx);
        self.reindex();
        Some(old)
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.by_id.get(id).map(|&idx| &self.entries[idx])
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// A blank name identifies nothing.
    pub fn find_by_name(&self, name: &str) -> Option<&E> {
        if is_blank(name) {
            return None;
        }
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Id of the first entry named `name`, if that entry has an id.
    pub fn resolve_id_by_name(&self, name: &str) -> Option<&str> {
        self.find_by_name(name).and_then(|e| e.id())
    }

    /// The entry `entity` is identified with: by id first, then by name.
    pub fn matching(&self, entity: &E) -> Option<&E> {
        entity
            .id()
            .and_then(|id| self.get(id))
            .or_else(|| self.find_by_name(entity.name()))
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&E) -> bool) -> Vec<E> {
        let (kept, dropped): (Vec<E>, Vec<E>) =
            std::mem::take(&mut self.entries).into_iter().partition(|e| keep(e));
        self.entries = kept;
        self.reindex();
        dropped
    }

    pub fn identity_matches(&self, entity: &E) -> bool {
        self.matching(entity).is_some()
    }

    fn index(&mut self, idx: usize, entity: &E) {
        if let Some(id) = entity.id() {
            self.by_id.entry(id.to_string()).or_insert(idx);
        }
        if !is_blank(entity.name()) {
            self.by_name.entry(entity.name().to_string()).or_insert(idx);
        }
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
        let entries = std::mem::take(&mut self.entries);
        for (idx, e) in entries.iter().enumerate() {
            self.index(idx, e);
        }
        self.entries = entries;
    }
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

impl<E: Entity> FromIterator<E> for EntitySet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut set = Self::new();
        for e in iter {
            set.push(e);
        }
        set
    }
}

impl<E> IntoIterator for EntitySet<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a EntitySet<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// EntityCollection
// ---------------------------------------------------------------------------

/// All entities of one side (declared config or deployment snapshot).
#[derive(Clone, Debug, Default)]
pub struct EntityCollection {
    pub sources: EntitySet<Source>,
    pub destinations: EntitySet<Destination>,
    pub links: EntitySet<Link>,
}

impl EntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<E: Entity>(&self) -> &EntitySet<E> {
        E::set_of(self)
    }

    pub fn set_mut<E: Entity>(&mut self) -> &mut EntitySet<E> {
        E::set_of_mut(self)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.destinations.is_empty() && self.links.is_empty()
    }

    /// Drop every link whose `kind` side points at `id`. Returns the dropped
    /// links.
    pub fn remove_links_to(&mut self, kind: EntityKind, id: &str) -> Vec<Link> {
        let side = |l: &Link| match kind {
            EntityKind::Source => l.source.id.as_deref() == Some(id),
            EntityKind::Destination => l.destination.id.as_deref() == Some(id),
            EntityKind::Link => false,
        };
        self.links.retain(|l| !side(l))
    }
}

/// True if `entity` is identified with an entry of the same kind in
/// `collection`: its id is a key there, or (failing that) an entry carries
/// exactly the same name.
pub fn identity_matches<E: Entity>(collection: &EntityCollection, entity: &E) -> bool {
    collection.set::<E>().identity_matches(entity)
}

/// Resolve a symbolic name to a concrete id within one kind.
pub fn resolve_id_by_name<'a>(
    collection: &'a EntityCollection,
    kind: EntityKind,
    name: &str,
) -> Option<&'a str> {
    match kind {
        EntityKind::Source => collection.sources.resolve_id_by_name(name),
        EntityKind::Destination => collection.destinations.resolve_id_by_name(name),
        EntityKind::Link => collection.links.resolve_id_by_name(name),
    }
}
