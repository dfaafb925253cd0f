//! Deterministic in-memory deployment.
//!
//! Behaves like a remote deployment for the parts the reconciler relies on:
//! - ids are assigned sequentially per kind: `"src-0001"`, `"dst-0001"`, `"lnk-0001"`.
//! - create without a definition id is rejected with invalid-input (422).
//! - update / delete of an unknown id is not-found (404).
//! - a link create whose source or destination id is unknown is not-found.
//! - a link update stores exactly the catalog it is given (`None` clears it).
//!
//! Failure injection: [`MemoryGateway::fail_on`] makes every mutation of the
//! named entity fail with the given status. Every mutation is recorded and
//! available through [`MemoryGateway::calls`]. No randomness, no timestamps.

use std::cell::RefCell;
use std::collections::BTreeMap;

use abt_gateway::{
    status_message, ConnectionCheck, Gateway, GatewayError, Operation, Outcome, StatusClass,
    Workspace, DEFAULT_WORKSPACE_SLUG,
};
use abt_model::{Destination, Entity, EntityKind, Link, Source, TypeRecord};
use serde_json::{json, Value};

/// One recorded mutation / check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub op: Operation,
    pub kind: EntityKind,
    pub name: String,
}

#[derive(Debug, Default)]
struct State {
    sources: Vec<Source>,
    destinations: Vec<Destination>,
    links: Vec<Link>,
    next_id: BTreeMap<EntityKind, u32>,
    calls: Vec<Call>,
    failures: BTreeMap<String, (StatusClass, String)>,
    checks: BTreeMap<String, ConnectionCheck>,
    catalogs: BTreeMap<String, Value>,
    unreachable: bool,
}

impl State {
    fn assign_id(&mut self, kind: EntityKind) -> String {
        let n = self.next_id.entry(kind).or_insert(0);
        *n += 1;
        let prefix = match kind {
            EntityKind::Source => "src",
            EntityKind::Destination => "dst",
            EntityKind::Link => "lnk",
        };
        format!("{prefix}-{n:04}")
    }

    /// Record the call and return the injected failure for `name`, if any.
    fn record(&mut self, op: Operation, kind: EntityKind, name: &str) -> Option<(StatusClass, String)> {
        self.calls.push(Call {
            op,
            kind,
            name: name.to_string(),
        });
        self.failures.get(name).cloned()
    }
}

fn http_code(status: StatusClass) -> u16 {
    match status {
        StatusClass::Ok => 200,
        StatusClass::NotFound => 404,
        StatusClass::InvalidInput => 422,
        StatusClass::Unrecognized => 500,
    }
}

fn rejected<T>(status: StatusClass, detail: &str) -> Outcome<T> {
    Outcome::from_http(http_code(status), None, Some(detail))
}

fn not_found<T>(what: &str) -> Outcome<T> {
    rejected(StatusClass::NotFound, what)
}

// ---------------------------------------------------------------------------
// MemoryGateway
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct MemoryGateway {
    workspace: Workspace,
    source_types: Vec<TypeRecord>,
    destination_types: Vec<TypeRecord>,
    state: RefCell<State>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            workspace: Workspace::new("ws-0001", DEFAULT_WORKSPACE_SLUG),
            source_types: Vec::new(),
            destination_types: Vec::new(),
            state: RefCell::new(State::default()),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn with_source_type(mut self, id: &str, name: &str) -> Self {
        self.source_types.push(TypeRecord::new(id, name));
        self
    }

    pub fn with_destination_type(mut self, id: &str, name: &str) -> Self {
        self.destination_types.push(TypeRecord::new(id, name));
        self
    }

    /// Put a source into the deployment directly (test setup). Returns its id.
    pub fn seed_source(&self, mut source: Source) -> String {
        let mut st = self.state.borrow_mut();
        let id = match source.id.clone() {
            Some(id) => id,
            None => st.assign_id(EntityKind::Source),
        };
        source.id = Some(id.clone());
        source.workspace_id = Some(self.workspace.id.clone());
        st.sources.push(source);
        id
    }

    pub fn seed_destination(&self, mut destination: Destination) -> String {
        let mut st = self.state.borrow_mut();
        let id = match destination.id.clone() {
            Some(id) => id,
            None => st.assign_id(EntityKind::Destination),
        };
        destination.id = Some(id.clone());
        destination.workspace_id = Some(self.workspace.id.clone());
        st.destinations.push(destination);
        id
    }

    pub fn seed_link(&self, mut link: Link) -> String {
        let mut st = self.state.borrow_mut();
        let id = match link.id.clone() {
            Some(id) => id,
            None => st.assign_id(EntityKind::Link),
        };
        link.id = Some(id.clone());
        st.links.push(link);
        id
    }

    /// Every mutation or check of an entity named `name` fails with `status`.
    pub fn fail_on(&self, name: &str, status: StatusClass, message: &str) {
        self.state
            .borrow_mut()
            .failures
            .insert(name.to_string(), (status, message.to_string()));
    }

    /// Connection-check result for the connector named `name`
    /// (default: succeeded).
    pub fn set_check(&self, name: &str, status: &str, message: Option<&str>) {
        self.state.borrow_mut().checks.insert(
            name.to_string(),
            ConnectionCheck {
                status: status.to_string(),
                message: message.map(str::to_string),
            },
        );
    }

    /// Catalog returned by schema discovery for `source_id`.
    pub fn set_catalog(&self, source_id: &str, catalog: Value) {
        self.state
            .borrow_mut()
            .catalogs
            .insert(source_id.to_string(), catalog);
    }

    /// Listing calls fail with a transport error while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.borrow_mut().unreachable = unreachable;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_for(&self, op: Operation) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.state.borrow().sources.clone()
    }

    pub fn destinations(&self) -> Vec<Destination> {
        self.state.borrow().destinations.clone()
    }

    pub fn links(&self) -> Vec<Link> {
        self.state.borrow().links.clone()
    }

    fn reachable(&self) -> Result<(), GatewayError> {
        if self.state.borrow().unreachable {
            return Err(GatewayError::Transport("memory gateway: unreachable".to_string()));
        }
        Ok(())
    }

    fn check_workspace(&self, workspace: &Workspace) -> Result<(), GatewayError> {
        self.reachable()?;
        if workspace.id != self.workspace.id {
            return Err(GatewayError::Api {
                http_status: 404,
                message: format!("workspace {} not found", workspace.id),
            });
        }
        Ok(())
    }
}

/// Shared delete logic over one kind's vector.
fn delete_in<E: Entity>(entries: &mut Vec<E>, entity: &E) -> Outcome<()> {
    let Some(id) = entity.id() else {
        return not_found("entity has no id");
    };
    match entries.iter().position(|e| e.id() == Some(id)) {
        Some(idx) => {
            entries.remove(idx);
            Outcome::from_http(204, Some(()), None)
        }
        None => not_found(&format!("{} {id}", E::KIND)),
    }
}

impl Gateway for MemoryGateway {
    fn get_workspace(&self, slug: &str) -> Result<Workspace, GatewayError> {
        self.reachable()?;
        if slug == self.workspace.slug {
            Ok(self.workspace.clone())
        } else {
            Err(GatewayError::Api {
                http_status: 404,
                message: status_message(404).to_string(),
            })
        }
    }

    fn list_source_types(&self) -> Result<Vec<TypeRecord>, GatewayError> {
        self.reachable()?;
        Ok(self.source_types.clone())
    }

    fn list_destination_types(&self) -> Result<Vec<TypeRecord>, GatewayError> {
        self.reachable()?;
        Ok(self.destination_types.clone())
    }

    fn list_sources(&self, workspace: &Workspace) -> Result<Vec<Source>, GatewayError> {
        self.check_workspace(workspace)?;
        Ok(self.sources())
    }

    fn list_destinations(&self, workspace: &Workspace) -> Result<Vec<Destination>, GatewayError> {
        self.check_workspace(workspace)?;
        Ok(self.destinations())
    }

    fn list_links(&self, workspace: &Workspace) -> Result<Vec<Link>, GatewayError> {
        self.check_workspace(workspace)?;
        Ok(self.links())
    }

    fn create_source(&self, source: &Source, workspace: &Workspace) -> Outcome<Source> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) = st.record(Operation::Create, EntityKind::Source, &source.name) {
            return rejected(status, &msg);
        }
        if source.definition_id.is_none() {
            return rejected(StatusClass::InvalidInput, "sourceDefinitionId is required");
        }
        let mut created = source.clone();
        created.id = Some(st.assign_id(EntityKind::Source));
        created.workspace_id = Some(workspace.id.clone());
        created.tag = None;
        st.sources.push(created.clone());
        Outcome::success(created)
    }

    fn update_source(&self, source: &Source) -> Outcome<Source> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) = st.record(Operation::Update, EntityKind::Source, &source.name) {
            return rejected(status, &msg);
        }
        let Some(existing) = st
            .sources
            .iter_mut()
            .find(|s| s.id.is_some() && s.id == source.id)
        else {
            return not_found("source");
        };
        existing.name = source.name.clone();
        existing.config = source.config.clone();
        Outcome::success(existing.clone())
    }

    fn delete_source(&self, source: &Source) -> Outcome<()> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) = st.record(Operation::Delete, EntityKind::Source, &source.name) {
            return rejected(status, &msg);
        }
        delete_in(&mut st.sources, source)
    }

    fn create_destination(
        &self,
        destination: &Destination,
        workspace: &Workspace,
    ) -> Outcome<Destination> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) =
            st.record(Operation::Create, EntityKind::Destination, &destination.name)
        {
            return rejected(status, &msg);
        }
        if destination.definition_id.is_none() {
            return rejected(StatusClass::InvalidInput, "destinationDefinitionId is required");
        }
        let mut created = destination.clone();
        created.id = Some(st.assign_id(EntityKind::Destination));
        created.workspace_id = Some(workspace.id.clone());
        created.tag = None;
        st.destinations.push(created.clone());
        Outcome::success(created)
    }

    fn update_destination(&self, destination: &Destination) -> Outcome<Destination> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) =
            st.record(Operation::Update, EntityKind::Destination, &destination.name)
        {
            return rejected(status, &msg);
        }
        let Some(existing) = st
            .destinations
            .iter_mut()
            .find(|d| d.id.is_some() && d.id == destination.id)
        else {
            return not_found("destination");
        };
        existing.name = destination.name.clone();
        existing.config = destination.config.clone();
        Outcome::success(existing.clone())
    }

    fn delete_destination(&self, destination: &Destination) -> Outcome<()> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) =
            st.record(Operation::Delete, EntityKind::Destination, &destination.name)
        {
            return rejected(status, &msg);
        }
        delete_in(&mut st.destinations, destination)
    }

    fn create_link(&self, link: &Link, _workspace: &Workspace) -> Outcome<Link> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) = st.record(Operation::Create, EntityKind::Link, &link.name) {
            return rejected(status, &msg);
        }
        let source_known = link
            .source
            .id
            .as_ref()
            .is_some_and(|id| st.sources.iter().any(|s| s.id.as_ref() == Some(id)));
        let destination_known = link
            .destination
            .id
            .as_ref()
            .is_some_and(|id| st.destinations.iter().any(|d| d.id.as_ref() == Some(id)));
        if !source_known || !destination_known {
            return not_found("link source or destination");
        }
        let mut created = link.clone();
        created.id = Some(st.assign_id(EntityKind::Link));
        // The remote side only knows ids.
        created.source.name = None;
        created.destination.name = None;
        st.links.push(created.clone());
        Outcome::success(created)
    }

    fn update_link(&self, link: &Link) -> Outcome<Link> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) = st.record(Operation::Update, EntityKind::Link, &link.name) {
            return rejected(status, &msg);
        }
        let Some(existing) = st
            .links
            .iter_mut()
            .find(|l| l.id.is_some() && l.id == link.id)
        else {
            return not_found("link");
        };
        existing.name = link.name.clone();
        existing.sync_catalog = link.sync_catalog.clone();
        existing.schedule = link.schedule.clone();
        existing.status = link.status;
        existing.prefix = link.prefix.clone();
        existing.namespace_definition = link.namespace_definition.clone();
        Outcome::success(existing.clone())
    }

    fn delete_link(&self, link: &Link) -> Outcome<()> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) = st.record(Operation::Delete, EntityKind::Link, &link.name) {
            return rejected(status, &msg);
        }
        delete_in(&mut st.links, link)
    }

    fn check_source(&self, source: &Source) -> Outcome<ConnectionCheck> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) = st.record(Operation::Check, EntityKind::Source, &source.name) {
            return rejected(status, &msg);
        }
        Outcome::success(st.checks.get(&source.name).cloned().unwrap_or(ConnectionCheck {
            status: "succeeded".to_string(),
            message: None,
        }))
    }

    fn check_destination(&self, destination: &Destination) -> Outcome<ConnectionCheck> {
        let mut st = self.state.borrow_mut();
        if let Some((status, msg)) =
            st.record(Operation::Check, EntityKind::Destination, &destination.name)
        {
            return rejected(status, &msg);
        }
        Outcome::success(
            st.checks
                .get(&destination.name)
                .cloned()
                .unwrap_or(ConnectionCheck {
                    status: "succeeded".to_string(),
                    message: None,
                }),
        )
    }

    fn discover_source_schema(&self, source_id: &str) -> Outcome<Value> {
        let mut st = self.state.borrow_mut();
        let name = st
            .sources
            .iter()
            .find(|s| s.id.as_deref() == Some(source_id))
            .map(|s| s.name.clone());
        let Some(name) = name else {
            return not_found("source");
        };
        if let Some((status, msg)) = st.record(Operation::Discover, EntityKind::Source, &name) {
            return rejected(status, &msg);
        }
        let catalog = st
            .catalogs
            .get(source_id)
            .cloned()
            .unwrap_or_else(|| json!({"streams": [{"stream": {"name": "default"}}]}));
        Outcome::success(catalog)
    }
}
