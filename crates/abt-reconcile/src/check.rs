use abt_gateway::{ConnectionCheck, Gateway, Operation, Outcome};
use abt_model::{Entity, EntityCollection, EntitySet};
use tracing::{info, warn};

use crate::{FailureCause, KindSelection, RunReport, Transition};

/// Run the deployment's connection check for every selected source and
/// destination in the snapshot. Links have no check and are skipped.
pub fn check_connectors(
    gateway: &dyn Gateway,
    snapshot: &EntityCollection,
    selection: KindSelection,
) -> RunReport {
    let mut report = RunReport::new();
    if selection.sources {
        check_each(&snapshot.sources, &mut report, |s| gateway.check_source(s));
    }
    if selection.destinations {
        check_each(&snapshot.destinations, &mut report, |d| {
            gateway.check_destination(d)
        });
    }
    info!(
        checked = report.count(Transition::Checked),
        failed = report.failures.len(),
        "connection checks finished"
    );
    report
}

fn check_each<E: Entity>(
    set: &EntitySet<E>,
    report: &mut RunReport,
    check: impl Fn(&E) -> Outcome<ConnectionCheck>,
) {
    for entity in set {
        match check(entity).into_result() {
            Ok(result) if result.succeeded() => {
                info!(kind = %E::KIND, name = %entity.name(), "connection check succeeded");
                let message = result.message.unwrap_or_else(|| result.status.clone());
                report.succeeded(E::KIND, entity.name(), entity.id(), Transition::Checked, message);
            }
            Ok(result) => {
                warn!(
                    kind = %E::KIND,
                    name = %entity.name(),
                    status = %result.status,
                    "connection check did not succeed"
                );
                report.failed(
                    E::KIND,
                    entity.name(),
                    Operation::Check,
                    FailureCause::Check {
                        status: result.status,
                        message: result.message,
                    },
                );
            }
            Err(failure) => {
                warn!(kind = %E::KIND, name = %entity.name(), error = %failure, "connection check failed");
                report.failed(E::KIND, entity.name(), Operation::Check, failure.into());
            }
        }
    }
}
