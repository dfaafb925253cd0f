//! Per-entity results of one run.
//!
//! Nothing in the reconcile loop raises: every terminal state (created,
//! updated, deleted, checked, failed) lands here and is summarized once the
//! run is over.

use std::fmt;

use abt_gateway::{Operation, RemoteFailure};
use abt_model::EntityKind;

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// A declared entity that cannot be sent to the deployment as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigIssue {
    /// The connector type name matched nothing in the type catalog.
    UnresolvedType { type_name: String },
    /// A link's source or destination could not be resolved to an id.
    UnresolvedReference { side: EntityKind, reference: String },
    MissingField { field: &'static str },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedType { type_name } => {
                write!(f, "no connector type named '{type_name}'")
            }
            Self::UnresolvedReference { side, reference } => {
                write!(f, "{side} '{reference}' does not exist in the deployment")
            }
            Self::MissingField { field } => write!(f, "required field '{field}' is empty"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureCause {
    Config(ConfigIssue),
    Remote(RemoteFailure),
    /// The deployment answered the connection check with a non-success status.
    Check {
        status: String,
        message: Option<String>,
    },
}

impl FailureCause {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(issue) => write!(f, "configuration error: {issue}"),
            Self::Remote(failure) => write!(f, "remote error: {failure}"),
            Self::Check { status, message } => match message {
                Some(m) => write!(f, "connection check {status}: {m}"),
                None => write!(f, "connection check {status}"),
            },
        }
    }
}

impl From<ConfigIssue> for FailureCause {
    fn from(issue: ConfigIssue) -> Self {
        Self::Config(issue)
    }
}

impl From<RemoteFailure> for FailureCause {
    fn from(failure: RemoteFailure) -> Self {
        Self::Remote(failure)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityFailure {
    pub kind: EntityKind,
    pub name: String,
    /// The operation that was attempted (or would have been).
    pub operation: Operation,
    pub cause: FailureCause,
}

impl fmt::Display for EntityFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}': {}",
            self.operation, self.kind, self.name, self.cause
        )
    }
}

// ---------------------------------------------------------------------------
// Successes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Created,
    Updated,
    Deleted,
    Checked,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Created => "created",
            Transition::Updated => "updated",
            Transition::Deleted => "deleted",
            Transition::Checked => "checked",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityOutcome {
    pub kind: EntityKind,
    pub name: String,
    pub id: Option<String>,
    pub transition: Transition,
    /// Remote message for the call (e.g. "Operation successful").
    pub message: String,
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<EntityOutcome>,
    pub failures: Vec<EntityFailure>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn count(&self, transition: Transition) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.transition == transition)
            .count()
    }

    pub fn outcomes_of(&self, kind: EntityKind) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(move |o| o.kind == kind)
    }

    /// Append another report (e.g. wipe, then sync, then check).
    pub fn extend(&mut self, other: RunReport) {
        self.outcomes.extend(other.outcomes);
        self.failures.extend(other.failures);
    }

    pub(crate) fn succeeded(
        &mut self,
        kind: EntityKind,
        name: &str,
        id: Option<&str>,
        transition: Transition,
        message: impl Into<String>,
    ) {
        self.outcomes.push(EntityOutcome {
            kind,
            name: name.to_string(),
            id: id.map(str::to_string),
            transition,
            message: message.into(),
        });
    }

    pub(crate) fn failed(
        &mut self,
        kind: EntityKind,
        name: &str,
        operation: Operation,
        cause: FailureCause,
    ) {
        self.failures.push(EntityFailure {
            kind,
            name: name.to_string(),
            operation,
            cause,
        });
    }
}

/// Multi-line operator summary.
impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "created={} updated={} deleted={} checked={} failed={}",
            self.count(Transition::Created),
            self.count(Transition::Updated),
            self.count(Transition::Deleted),
            self.count(Transition::Checked),
            self.failures.len()
        )?;
        for o in &self.outcomes {
            writeln!(
                f,
                "  {:<8} {:<11} {} ({})",
                o.transition.as_str(),
                o.kind,
                o.name,
                o.id.as_deref().unwrap_or("-")
            )?;
        }
        for e in &self.failures {
            writeln!(f, "  FAILED   {e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abt_gateway::StatusClass;

    #[test]
    fn failure_display_names_operation_and_entity() {
        let e = EntityFailure {
            kind: EntityKind::Source,
            name: "repo".to_string(),
            operation: Operation::Create,
            cause: RemoteFailure {
                status: StatusClass::InvalidInput,
                http_status: Some(422),
                message: "Invalid input".to_string(),
            }
            .into(),
        };
        assert_eq!(
            e.to_string(),
            "create source 'repo': remote error: [invalid-input 422] Invalid input"
        );
    }

    #[test]
    fn summary_counts() {
        let mut r = RunReport::new();
        r.succeeded(EntityKind::Source, "a", Some("s1"), Transition::Created, "ok");
        r.succeeded(EntityKind::Link, "l", Some("l1"), Transition::Updated, "ok");
        r.failed(
            EntityKind::Link,
            "m",
            Operation::Create,
            ConfigIssue::MissingField { field: "name" }.into(),
        );

        let text = r.to_string();
        assert!(text.starts_with("created=1 updated=1 deleted=0 checked=0 failed=1"));
        assert!(text.contains("FAILED   create link 'm'"));
        assert!(r.has_failures());
        assert_eq!(r.outcomes_of(EntityKind::Source).count(), 1);
    }
}
