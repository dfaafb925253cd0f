//! abt-reconcile
//!
//! Declared state vs deployment state.
//!
//! - [`fetch_snapshot`] materializes the deployment into an `EntityCollection`.
//! - [`reconcile`] creates or updates every declared entity, in the fixed order
//!   sources, destinations, links, folding each remote result back into the
//!   snapshot so later links can resolve names.
//! - [`wipe`] and [`check_connectors`] are the delete and connection-check
//!   workflows over the same snapshot.
//!
//! Every per-entity problem becomes an entry in the [`RunReport`]; one bad
//! entity never stops the batch.

mod check;
mod engine;
mod report;
mod snapshot;
mod wipe;

pub use check::check_connectors;
pub use engine::{reconcile, Reconcilable, Refusal};
pub use report::{ConfigIssue, EntityFailure, EntityOutcome, FailureCause, RunReport, Transition};
pub use snapshot::fetch_snapshot;
pub use wipe::wipe;

use abt_model::EntityKind;

/// Which entity kinds a workflow touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KindSelection {
    pub sources: bool,
    pub destinations: bool,
    pub links: bool,
}

impl KindSelection {
    pub const ALL: KindSelection = KindSelection {
        sources: true,
        destinations: true,
        links: true,
    };

    /// Selecting nothing means everything.
    pub fn from_flags(sources: bool, destinations: bool, links: bool) -> Self {
        if !(sources || destinations || links) {
            return Self::ALL;
        }
        Self {
            sources,
            destinations,
            links,
        }
    }

    pub fn includes(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Source => self.sources,
            EntityKind::Destination => self.destinations,
            EntityKind::Link => self.links,
        }
    }
}

impl Default for KindSelection {
    fn default() -> Self {
        Self::ALL
    }
}
