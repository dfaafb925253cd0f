//! Create-or-update reconciliation.
//!
//! Per declared entity, in declaration order:
//! - Matched (by id, else by exact name) => update with the declared
//!   attributes merged onto the snapshot record.
//! - Absent => prepare (configuration checks, link reference resolution,
//!   schema discovery) and create.
//!
//! A successful call replaces/inserts the returned record in the snapshot.
//! A failed call is recorded and the loop moves on.

use abt_gateway::{Gateway, Operation, Outcome, Workspace};
use abt_model::{
    ConnectorConfig, Destination, Entity, EntityCollection, EntityKind, EntityRef, EntitySet,
    Link, Source,
};
use tracing::{info, warn};

use crate::{ConfigIssue, FailureCause, KindSelection, RunReport, Transition};

/// Why a declared entity was stopped before its create call went out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Refusal {
    pub operation: Operation,
    pub cause: FailureCause,
}

impl Refusal {
    fn config(issue: ConfigIssue) -> Self {
        Self {
            operation: Operation::Create,
            cause: issue.into(),
        }
    }
}

/// Per-kind operations the generic loop needs.
pub trait Reconcilable: Entity {
    /// Checks and fills in whatever a create needs. Runs only for entities
    /// with no match in the snapshot.
    fn prepare_create(
        &mut self,
        gateway: &dyn Gateway,
        snapshot: &EntityCollection,
    ) -> Result<(), Refusal>;

    /// The update payload: `existing` with the declared attributes applied.
    fn merged_onto(&self, existing: &Self) -> Self;

    /// Declared differences that [`Reconcilable::merged_onto`] does not carry
    /// into the update, one line each.
    fn ignored_changes(&self, _existing: &Self, _snapshot: &EntityCollection) -> Vec<String> {
        Vec::new()
    }

    fn create(&self, gateway: &dyn Gateway, workspace: &Workspace) -> Outcome<Self>;
    fn update(&self, gateway: &dyn Gateway) -> Outcome<Self>;
    fn delete(&self, gateway: &dyn Gateway) -> Outcome<()>;
}

// ---------------------------------------------------------------------------
// Sources / destinations
// ---------------------------------------------------------------------------

fn prepare_connector(
    name: &str,
    definition_id: Option<&str>,
    type_name: &str,
) -> Result<(), Refusal> {
    if name.trim().is_empty() {
        return Err(Refusal::config(ConfigIssue::MissingField { field: "name" }));
    }
    if definition_id.is_none() {
        return Err(Refusal::config(ConfigIssue::UnresolvedType {
            type_name: type_name.to_string(),
        }));
    }
    Ok(())
}

/// Declared keys win; keys only the deployment knows are kept.
fn overlay_config(existing: &ConnectorConfig, declared: &ConnectorConfig) -> ConnectorConfig {
    let mut merged = existing.clone();
    for (k, v) in declared {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

impl Reconcilable for Source {
    fn prepare_create(&mut self, _: &dyn Gateway, _: &EntityCollection) -> Result<(), Refusal> {
        prepare_connector(&self.name, self.definition_id.as_deref(), &self.type_name)
    }

    fn merged_onto(&self, existing: &Self) -> Self {
        Source {
            name: self.name.clone(),
            config: overlay_config(&existing.config, &self.config),
            tag: self.tag.clone().or_else(|| existing.tag.clone()),
            ..existing.clone()
        }
    }

    fn create(&self, gateway: &dyn Gateway, workspace: &Workspace) -> Outcome<Self> {
        gateway.create_source(self, workspace)
    }

    fn update(&self, gateway: &dyn Gateway) -> Outcome<Self> {
        gateway.update_source(self)
    }

    fn delete(&self, gateway: &dyn Gateway) -> Outcome<()> {
        gateway.delete_source(self)
    }
}

impl Reconcilable for Destination {
    fn prepare_create(&mut self, _: &dyn Gateway, _: &EntityCollection) -> Result<(), Refusal> {
        prepare_connector(&self.name, self.definition_id.as_deref(), &self.type_name)
    }

    fn merged_onto(&self, existing: &Self) -> Self {
        Destination {
            name: self.name.clone(),
            config: overlay_config(&existing.config, &self.config),
            tag: self.tag.clone().or_else(|| existing.tag.clone()),
            ..existing.clone()
        }
    }

    fn create(&self, gateway: &dyn Gateway, workspace: &Workspace) -> Outcome<Self> {
        gateway.create_destination(self, workspace)
    }

    fn update(&self, gateway: &dyn Gateway) -> Outcome<Self> {
        gateway.update_destination(self)
    }

    fn delete(&self, gateway: &dyn Gateway) -> Outcome<()> {
        gateway.delete_destination(self)
    }
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Id of the referenced entity, if it is in `set`. A stale id falls back to
/// the name.
fn resolve_ref<E: Entity>(r: &EntityRef, set: &EntitySet<E>) -> Option<String> {
    r.resolve(set)
        .filter(|id| set.contains_id(id))
        .or_else(|| {
            r.name
                .as_deref()
                .and_then(|n| set.resolve_id_by_name(n))
                .map(str::to_string)
        })
}

impl Reconcilable for Link {
    fn prepare_create(
        &mut self,
        gateway: &dyn Gateway,
        snapshot: &EntityCollection,
    ) -> Result<(), Refusal> {
        if self.name.trim().is_empty() {
            return Err(Refusal::config(ConfigIssue::MissingField { field: "name" }));
        }

        let Some(source_id) = resolve_ref(&self.source, &snapshot.sources) else {
            return Err(Refusal::config(ConfigIssue::UnresolvedReference {
                side: EntityKind::Source,
                reference: self.source.describe(),
            }));
        };
        let Some(destination_id) = resolve_ref(&self.destination, &snapshot.destinations) else {
            return Err(Refusal::config(ConfigIssue::UnresolvedReference {
                side: EntityKind::Destination,
                reference: self.destination.describe(),
            }));
        };

        if !self.has_sync_catalog() {
            let catalog = gateway
                .discover_source_schema(&source_id)
                .into_result()
                .map_err(|f| Refusal {
                    operation: Operation::Discover,
                    cause: f.into(),
                })?;
            self.sync_catalog = Some(catalog);
        }

        self.source.id = Some(source_id);
        self.destination.id = Some(destination_id);
        Ok(())
    }

    /// An empty declared catalog never clears the deployment's catalog. The
    /// endpoints are the deployment's.
    fn merged_onto(&self, existing: &Self) -> Self {
        let sync_catalog = if self.has_sync_catalog() {
            self.sync_catalog.clone()
        } else {
            existing.sync_catalog.clone()
        };
        Link {
            name: self.name.clone(),
            sync_catalog,
            schedule: self.schedule.clone().or_else(|| existing.schedule.clone()),
            prefix: self.prefix.clone().or_else(|| existing.prefix.clone()),
            namespace_definition: self
                .namespace_definition
                .clone()
                .or_else(|| existing.namespace_definition.clone()),
            status: self.status,
            ..existing.clone()
        }
    }

    fn ignored_changes(&self, existing: &Self, snapshot: &EntityCollection) -> Vec<String> {
        let sides = [
            (
                "source",
                &self.source,
                &existing.source,
                resolve_ref(&self.source, &snapshot.sources),
            ),
            (
                "destination",
                &self.destination,
                &existing.destination,
                resolve_ref(&self.destination, &snapshot.destinations),
            ),
        ];
        sides
            .into_iter()
            .filter(|(_, _, deployed, resolved)| resolved.as_deref() != deployed.id.as_deref())
            .map(|(side, declared, deployed, _)| {
                format!(
                    "{side}: declared {} but deployment has {}",
                    declared.describe(),
                    deployed.describe()
                )
            })
            .collect()
    }

    fn create(&self, gateway: &dyn Gateway, workspace: &Workspace) -> Outcome<Self> {
        gateway.create_link(self, workspace)
    }

    fn update(&self, gateway: &dyn Gateway) -> Outcome<Self> {
        gateway.update_link(self)
    }

    fn delete(&self, gateway: &dyn Gateway) -> Outcome<()> {
        gateway.delete_link(self)
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Reconcile the selected kinds of `declared` against `snapshot`.
///
/// `snapshot` is updated in place and reflects the deployment after the run.
pub fn reconcile(
    gateway: &dyn Gateway,
    workspace: &Workspace,
    declared: &EntityCollection,
    snapshot: &mut EntityCollection,
    selection: KindSelection,
) -> RunReport {
    let mut report = RunReport::new();

    // Links resolve against sources/destinations, so this order is fixed.
    if selection.sources {
        reconcile_kind(gateway, workspace, &declared.sources, snapshot, &mut report);
    }
    if selection.destinations {
        reconcile_kind(gateway, workspace, &declared.destinations, snapshot, &mut report);
    }
    if selection.links {
        reconcile_kind(gateway, workspace, &declared.links, snapshot, &mut report);
    }

    info!(
        created = report.count(Transition::Created),
        updated = report.count(Transition::Updated),
        failed = report.failures.len(),
        "reconcile finished"
    );
    report
}

fn reconcile_kind<E: Reconcilable>(
    gateway: &dyn Gateway,
    workspace: &Workspace,
    declared: &EntitySet<E>,
    snapshot: &mut EntityCollection,
    report: &mut RunReport,
) {
    for entity in declared {
        match snapshot.set::<E>().matching(entity).cloned() {
            Some(existing) => update_one(gateway, entity, &existing, snapshot, report),
            None => create_one(gateway, workspace, entity, snapshot, report),
        }
    }
}

fn update_one<E: Reconcilable>(
    gateway: &dyn Gateway,
    declared: &E,
    existing: &E,
    snapshot: &mut EntityCollection,
    report: &mut RunReport,
) {
    for change in declared.ignored_changes(existing, snapshot) {
        warn!(
            kind = %E::KIND,
            name = %declared.name(),
            id = existing.id().unwrap_or("-"),
            %change,
            "declared change not applied by update"
        );
    }
    let outcome = declared.merged_onto(existing).update(gateway);
    let message = outcome.message.clone();
    match outcome.into_result() {
        Ok(updated) => {
            info!(kind = %E::KIND, name = %declared.name(), id = updated.id().unwrap_or("-"), "updated");
            report.succeeded(E::KIND, declared.name(), updated.id(), Transition::Updated, message);
            snapshot.set_mut::<E>().upsert(updated);
        }
        Err(failure) => {
            warn!(kind = %E::KIND, name = %declared.name(), error = %failure, "update failed");
            report.failed(E::KIND, declared.name(), Operation::Update, failure.into());
        }
    }
}

fn create_one<E: Reconcilable>(
    gateway: &dyn Gateway,
    workspace: &Workspace,
    declared: &E,
    snapshot: &mut EntityCollection,
    report: &mut RunReport,
) {
    let mut candidate = declared.clone();
    if let Err(refusal) = candidate.prepare_create(gateway, snapshot) {
        warn!(
            kind = %E::KIND,
            name = %declared.name(),
            operation = %refusal.operation,
            error = %refusal.cause,
            "not created"
        );
        report.failed(E::KIND, declared.name(), refusal.operation, refusal.cause);
        return;
    }

    let outcome = candidate.create(gateway, workspace);
    let message = outcome.message.clone();
    match outcome.into_result() {
        Ok(created) => {
            info!(kind = %E::KIND, name = %declared.name(), id = created.id().unwrap_or("-"), "created");
            report.succeeded(E::KIND, declared.name(), created.id(), Transition::Created, message);
            snapshot.set_mut::<E>().upsert(created);
        }
        Err(failure) => {
            warn!(kind = %E::KIND, name = %declared.name(), error = %failure, "create failed");
            report.failed(E::KIND, declared.name(), Operation::Create, failure.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link_with_catalog(catalog: Option<serde_json::Value>) -> Link {
        Link {
            sync_catalog: catalog,
            ..Link::new("l", EntityRef::by_name("s"), EntityRef::by_name("d"))
        }
    }

    #[test]
    fn empty_declared_catalog_keeps_existing() {
        let existing = Link {
            id: Some("l1".into()),
            source: EntityRef::by_id("s1"),
            destination: EntityRef::by_id("d1"),
            ..link_with_catalog(Some(json!({"streams": [{"stream": {"name": "issues"}}]})))
        };

        for empty in [None, Some(json!({})), Some(json!({"streams": []}))] {
            let merged = link_with_catalog(empty).merged_onto(&existing);
            assert_eq!(merged.sync_catalog, existing.sync_catalog);
            assert_eq!(merged.id.as_deref(), Some("l1"));
            assert_eq!(merged.source, EntityRef::by_id("s1"));
        }

        let declared = link_with_catalog(Some(json!({"streams": [{"stream": {"name": "pulls"}}]})));
        assert_eq!(declared.merged_onto(&existing).sync_catalog, declared.sync_catalog);
    }

    #[test]
    fn moved_endpoint_is_listed_as_ignored() {
        let mut snapshot = EntityCollection::new();
        for (id, name) in [("s1", "repo"), ("s2", "other")] {
            snapshot.sources.push(Source {
                id: Some(id.into()),
                ..Source::new(name, "GitHub")
            });
        }
        snapshot.destinations.push(Destination {
            id: Some("d1".into()),
            ..Destination::new("dw", "Postgres")
        });
        let existing = Link {
            id: Some("l1".into()),
            ..Link::new("l", EntityRef::by_id("s1"), EntityRef::by_id("d1"))
        };

        let same = Link::new("l", EntityRef::by_name("repo"), EntityRef::by_name("dw"));
        assert!(same.ignored_changes(&existing, &snapshot).is_empty());

        let moved = Link::new("l", EntityRef::by_name("other"), EntityRef::by_name("dw"));
        let ignored = moved.ignored_changes(&existing, &snapshot);
        assert_eq!(ignored, vec!["source: declared other but deployment has s1".to_string()]);
        assert_eq!(moved.merged_onto(&existing).source, EntityRef::by_id("s1"));
    }

    #[test]
    fn config_overlay_keeps_deployment_only_keys() {
        let mut existing = Source::new("repo", "GitHub");
        existing.id = Some("s1".into());
        existing.definition_id = Some("def".into());
        existing.config = json!({"access_token": "**********", "start_date": "2020-01-01"})
            .as_object()
            .cloned()
            .unwrap();

        let mut declared = Source::new("repo", "GitHub");
        declared.config = json!({"access_token": "tok-123"}).as_object().cloned().unwrap();

        let merged = declared.merged_onto(&existing);
        assert_eq!(merged.id.as_deref(), Some("s1"));
        assert_eq!(merged.definition_id.as_deref(), Some("def"));
        assert_eq!(merged.config["access_token"], json!("tok-123"));
        assert_eq!(merged.config["start_date"], json!("2020-01-01"));
    }

    #[test]
    fn stale_ref_id_falls_back_to_name() {
        let mut sources = EntitySet::new();
        sources.push(Source {
            id: Some("s1".into()),
            ..Source::new("repo", "GitHub")
        });

        let stale = EntityRef {
            id: Some("gone".into()),
            name: Some("repo".into()),
        };
        assert_eq!(resolve_ref(&stale, &sources).as_deref(), Some("s1"));
        assert_eq!(resolve_ref(&EntityRef::by_id("gone"), &sources), None);
    }
}
