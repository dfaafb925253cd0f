//! abt-gateway
//!
//! The remote boundary: every read and write against a deployment goes
//! through the [`Gateway`] trait.
//!
//! - Listing / lookup calls return `Result<_, GatewayError>`. A failure there
//!   means the deployment cannot be read, which is fatal for the run.
//! - Mutations return an [`Outcome`]. A failed mutation is terminal for one
//!   entity only.
//!
//! [`HttpGateway`] implements the trait over the deployment's JSON API with a
//! blocking client; calls are issued one at a time.

mod http;
mod outcome;

use std::fmt;

use abt_model::{Destination, Link, Source, TypeRecord};
use serde_json::Value;

pub use http::HttpGateway;
pub use outcome::{status_message, Outcome, RemoteFailure, StatusClass};

/// Slug used when the operator does not name a workspace.
pub const DEFAULT_WORKSPACE_SLUG: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    pub id: String,
    pub slug: String,
    pub name: Option<String>,
}

impl Workspace {
    pub fn new(id: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            name: None,
        }
    }
}

/// Remote operation vocabulary, used when recording and reporting calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Check,
    Discover,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Check => "check",
            Operation::Discover => "discover",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a remote connection check for one connector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionCheck {
    /// Raw status string, e.g. `"succeeded"` / `"failed"`.
    pub status: String,
    pub message: Option<String>,
}

impl ConnectionCheck {
    pub fn succeeded(&self) -> bool {
        self.status.eq_ignore_ascii_case("succeeded")
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from listing / lookup calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No response: connection refused, DNS, TLS, ...
    Transport(String),
    /// The deployment answered with a non-success status.
    Api { http_status: u16, message: String },
    /// The response body did not have the expected shape.
    Decode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport(msg) => write!(f, "transport error: {msg}"),
            GatewayError::Api {
                http_status,
                message,
            } => write!(f, "remote api error status={http_status}: {message}"),
            GatewayError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Capability set the reconciler consumes.
///
/// Object-safe so callers can hold a `&dyn Gateway`.
pub trait Gateway {
    fn get_workspace(&self, slug: &str) -> Result<Workspace, GatewayError>;

    fn list_source_types(&self) -> Result<Vec<TypeRecord>, GatewayError>;
    fn list_destination_types(&self) -> Result<Vec<TypeRecord>, GatewayError>;

    fn list_sources(&self, workspace: &Workspace) -> Result<Vec<Source>, GatewayError>;
    fn list_destinations(&self, workspace: &Workspace) -> Result<Vec<Destination>, GatewayError>;
    fn list_links(&self, workspace: &Workspace) -> Result<Vec<Link>, GatewayError>;

    fn create_source(&self, source: &Source, workspace: &Workspace) -> Outcome<Source>;
    fn update_source(&self, source: &Source) -> Outcome<Source>;
    fn delete_source(&self, source: &Source) -> Outcome<()>;

    fn create_destination(
        &self,
        destination: &Destination,
        workspace: &Workspace,
    ) -> Outcome<Destination>;
    fn update_destination(&self, destination: &Destination) -> Outcome<Destination>;
    fn delete_destination(&self, destination: &Destination) -> Outcome<()>;

    /// `link.source.id` / `link.destination.id` must already be resolved.
    fn create_link(&self, link: &Link, workspace: &Workspace) -> Outcome<Link>;
    fn update_link(&self, link: &Link) -> Outcome<Link>;
    fn delete_link(&self, link: &Link) -> Outcome<()>;

    fn check_source(&self, source: &Source) -> Outcome<ConnectionCheck>;
    fn check_destination(&self, destination: &Destination) -> Outcome<ConnectionCheck>;

    /// Discover the stream catalog a source exposes.
    fn discover_source_schema(&self, source_id: &str) -> Outcome<Value>;
}
