use abt_gateway::{Gateway, Operation};
use abt_model::{Destination, EntityCollection, Link, Source};
use tracing::{info, warn};

use crate::{KindSelection, Reconcilable, RunReport, Transition};

/// Delete every selected entity in the snapshot.
///
/// Links go first so no source or destination is deleted while a link still
/// points at it. Each deleted entity is removed from `snapshot`, together with
/// any snapshot link that references it (links that were not selected).
pub fn wipe(
    gateway: &dyn Gateway,
    snapshot: &mut EntityCollection,
    selection: KindSelection,
) -> RunReport {
    let mut report = RunReport::new();
    if selection.links {
        delete_kind::<Link>(gateway, snapshot, &mut report);
    }
    if selection.sources {
        delete_kind::<Source>(gateway, snapshot, &mut report);
    }
    if selection.destinations {
        delete_kind::<Destination>(gateway, snapshot, &mut report);
    }
    info!(
        deleted = report.count(Transition::Deleted),
        failed = report.failures.len(),
        "wipe finished"
    );
    report
}

fn delete_kind<E: Reconcilable>(
    gateway: &dyn Gateway,
    snapshot: &mut EntityCollection,
    report: &mut RunReport,
) {
    let entries: Vec<E> = snapshot.set::<E>().iter().cloned().collect();
    for entity in entries {
        let outcome = entity.delete(gateway);
        let message = outcome.message.clone();
        match outcome.into_result() {
            Ok(()) => {
                info!(kind = %E::KIND, name = %entity.name(), id = entity.id().unwrap_or("-"), "deleted");
                if let Some(id) = entity.id() {
                    snapshot.set_mut::<E>().remove(id);
                    let orphaned = snapshot.remove_links_to(E::KIND, id);
                    if !orphaned.is_empty() {
                        info!(
                            kind = %E::KIND,
                            id,
                            links = orphaned.len(),
                            "dropped links referencing deleted entity from snapshot"
                        );
                    }
                }
                report.succeeded(E::KIND, entity.name(), entity.id(), Transition::Deleted, message);
            }
            Err(failure) => {
                warn!(kind = %E::KIND, name = %entity.name(), error = %failure, "delete failed");
                report.failed(E::KIND, entity.name(), Operation::Delete, failure.into());
            }
        }
    }
}
