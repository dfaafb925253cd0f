//! HTTP implementation of [`Gateway`] over the deployment's `/api/v1` routes.
//!
//! Every route is a `POST` with a JSON body. Response classification follows
//! [`StatusClass::from_http`]; remote error text (`{"message": ...}`) is
//! carried into the outcome message.

use abt_model::{
    Destination, DestinationRecord, Link, LinkRecord, Source, SourceRecord, TypeRecord,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{
    status_message, ConnectionCheck, Gateway, GatewayError, Outcome, StatusClass, Workspace,
};

/// Blocking HTTP gateway.
///
/// Credentials live inside connector configuration payloads; request bodies
/// are never logged.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::blocking::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn route(&self, relative: &str) -> String {
        format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), relative)
    }

    fn post(&self, relative: &str, body: &Value) -> Result<RawResponse, GatewayError> {
        let url = self.route(relative);
        debug!(%url, "POST");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| GatewayError::Transport(format!("POST {url}: {e}")))?;

        let code = resp.status().as_u16();
        let text = resp
            .text()
            .map_err(|e| GatewayError::Transport(format!("POST {url}: reading body: {e}")))?;

        let body = if text.trim().is_empty() {
            None
        } else {
            // Non-JSON error pages are kept verbatim so the message survives.
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };

        debug!(%url, status = code, "response");
        Ok(RawResponse { code, body })
    }

    /// Listing / lookup: anything but a decodable success is an error.
    fn fetch<T: DeserializeOwned>(&self, relative: &str, body: &Value) -> Result<T, GatewayError> {
        let raw = self.post(relative, body)?;
        if StatusClass::from_http(raw.code) != StatusClass::Ok {
            let message = raw
                .detail()
                .unwrap_or_else(|| status_message(raw.code).to_string());
            return Err(GatewayError::Api {
                http_status: raw.code,
                message,
            });
        }
        let value = raw
            .body
            .ok_or_else(|| GatewayError::Decode(format!("{relative}: empty response body")))?;
        serde_json::from_value(value).map_err(|e| GatewayError::Decode(format!("{relative}: {e}")))
    }

    /// Mutation: every failure mode becomes a non-ok outcome.
    fn call<T: DeserializeOwned>(&self, relative: &str, body: &Value) -> Outcome<T> {
        let raw = match self.post(relative, body) {
            Ok(raw) => raw,
            Err(e) => return Outcome::failure(StatusClass::Unrecognized, e.to_string()),
        };
        if StatusClass::from_http(raw.code) != StatusClass::Ok {
            return Outcome::from_http(raw.code, None, raw.detail().as_deref());
        }
        match raw.body {
            None => Outcome::from_http(raw.code, None, None),
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(payload) => Outcome::from_http(raw.code, Some(payload), None),
                Err(e) => {
                    let mut out = Outcome::failure(
                        StatusClass::Unrecognized,
                        format!("{relative}: undecodable response: {e}"),
                    );
                    out.http_status = Some(raw.code);
                    out
                }
            },
        }
    }

    /// Mutation with no meaningful response body (deletes).
    fn call_empty(&self, relative: &str, body: &Value) -> Outcome<()> {
        match self.post(relative, body) {
            Ok(raw) => {
                let detail = raw.detail();
                Outcome::from_http(raw.code, Some(()), detail.as_deref())
            }
            Err(e) => Outcome::failure(StatusClass::Unrecognized, e.to_string()),
        }
    }
}

struct RawResponse {
    code: u16,
    body: Option<Value>,
}

impl RawResponse {
    /// Remote error text, if the body carries one.
    fn detail(&self) -> Option<String> {
        match self.body.as_ref()? {
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceRead {
    workspace_id: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceDefinitionList {
    #[serde(default)]
    source_definitions: Vec<SourceDefinitionRead>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceDefinitionRead {
    source_definition_id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinationDefinitionList {
    #[serde(default)]
    destination_definitions: Vec<DestinationDefinitionRead>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DestinationDefinitionRead {
    destination_definition_id: String,
    name: String,
}

#[derive(Deserialize)]
struct SourceList {
    #[serde(default)]
    sources: Vec<SourceRecord>,
}

#[derive(Deserialize)]
struct DestinationList {
    #[serde(default)]
    destinations: Vec<DestinationRecord>,
}

#[derive(Deserialize)]
struct LinkList {
    #[serde(default)]
    connections: Vec<LinkRecord>,
}

#[derive(Deserialize)]
struct CheckRead {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct DiscoverRead {
    #[serde(default)]
    catalog: Option<Value>,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

fn link_body(link: &Link) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("name".into(), json!(link.name));
    body.insert("status".into(), json!(link.status.as_str()));
    if let Some(catalog) = &link.sync_catalog {
        body.insert("syncCatalog".into(), catalog.clone());
    }
    if let Some(schedule) = &link.schedule {
        body.insert("schedule".into(), schedule.clone());
    }
    if let Some(prefix) = &link.prefix {
        body.insert("prefix".into(), json!(prefix));
    }
    if let Some(ns) = &link.namespace_definition {
        body.insert("namespaceDefinition".into(), json!(ns));
    }
    body
}

// ---------------------------------------------------------------------------
// Gateway impl
// ---------------------------------------------------------------------------

impl Gateway for HttpGateway {
    fn get_workspace(&self, slug: &str) -> Result<Workspace, GatewayError> {
        let read: WorkspaceRead = self.fetch("workspaces/get_by_slug", &json!({ "slug": slug }))?;
        Ok(Workspace {
            id: read.workspace_id,
            slug: read.slug.unwrap_or_else(|| slug.to_string()),
            name: read.name,
        })
    }

    fn list_source_types(&self) -> Result<Vec<TypeRecord>, GatewayError> {
        let list: SourceDefinitionList = self.fetch("source_definitions/list", &json!({}))?;
        Ok(list
            .source_definitions
            .into_iter()
            .map(|d| TypeRecord::new(d.source_definition_id, d.name))
            .collect())
    }

    fn list_destination_types(&self) -> Result<Vec<TypeRecord>, GatewayError> {
        let list: DestinationDefinitionList =
            self.fetch("destination_definitions/list", &json!({}))?;
        Ok(list
            .destination_definitions
            .into_iter()
            .map(|d| TypeRecord::new(d.destination_definition_id, d.name))
            .collect())
    }

    fn list_sources(&self, workspace: &Workspace) -> Result<Vec<Source>, GatewayError> {
        let list: SourceList =
            self.fetch("sources/list", &json!({ "workspaceId": workspace.id }))?;
        Ok(list.sources.into_iter().map(Source::from_record).collect())
    }

    fn list_destinations(&self, workspace: &Workspace) -> Result<Vec<Destination>, GatewayError> {
        let list: DestinationList =
            self.fetch("destinations/list", &json!({ "workspaceId": workspace.id }))?;
        Ok(list
            .destinations
            .into_iter()
            .map(Destination::from_record)
            .collect())
    }

    fn list_links(&self, workspace: &Workspace) -> Result<Vec<Link>, GatewayError> {
        let list: LinkList =
            self.fetch("connections/list", &json!({ "workspaceId": workspace.id }))?;
        Ok(list.connections.into_iter().map(Link::from_record).collect())
    }

    fn create_source(&self, source: &Source, workspace: &Workspace) -> Outcome<Source> {
        let body = json!({
            "sourceDefinitionId": source.definition_id,
            "workspaceId": workspace.id,
            "connectionConfiguration": source.config,
            "name": source.name,
        });
        self.call::<SourceRecord>("sources/create", &body)
            .map(Source::from_record)
    }

    fn update_source(&self, source: &Source) -> Outcome<Source> {
        let body = json!({
            "sourceId": source.id,
            "connectionConfiguration": source.config,
            "name": source.name,
        });
        self.call::<SourceRecord>("sources/update", &body)
            .map(Source::from_record)
    }

    fn delete_source(&self, source: &Source) -> Outcome<()> {
        self.call_empty("sources/delete", &json!({ "sourceId": source.id }))
    }

    fn create_destination(
        &self,
        destination: &Destination,
        workspace: &Workspace,
    ) -> Outcome<Destination> {
        let body = json!({
            "destinationDefinitionId": destination.definition_id,
            "workspaceId": workspace.id,
            "connectionConfiguration": destination.config,
            "name": destination.name,
        });
        self.call::<DestinationRecord>("destinations/create", &body)
            .map(Destination::from_record)
    }

    fn update_destination(&self, destination: &Destination) -> Outcome<Destination> {
        let body = json!({
            "destinationId": destination.id,
            "connectionConfiguration": destination.config,
            "name": destination.name,
        });
        self.call::<DestinationRecord>("destinations/update", &body)
            .map(Destination::from_record)
    }

    fn delete_destination(&self, destination: &Destination) -> Outcome<()> {
        self.call_empty(
            "destinations/delete",
            &json!({ "destinationId": destination.id }),
        )
    }

    fn create_link(&self, link: &Link, _workspace: &Workspace) -> Outcome<Link> {
        let mut body = link_body(link);
        body.insert("sourceId".into(), json!(link.source.id));
        body.insert("destinationId".into(), json!(link.destination.id));
        self.call::<LinkRecord>("connections/create", &Value::Object(body))
            .map(Link::from_record)
    }

    fn update_link(&self, link: &Link) -> Outcome<Link> {
        let mut body = link_body(link);
        body.insert("connectionId".into(), json!(link.id));
        self.call::<LinkRecord>("connections/update", &Value::Object(body))
            .map(Link::from_record)
    }

    fn delete_link(&self, link: &Link) -> Outcome<()> {
        self.call_empty("connections/delete", &json!({ "connectionId": link.id }))
    }

    fn check_source(&self, source: &Source) -> Outcome<ConnectionCheck> {
        self.call::<CheckRead>("sources/check_connection", &json!({ "sourceId": source.id }))
            .map(|r| ConnectionCheck {
                status: r.status,
                message: r.message,
            })
    }

    fn check_destination(&self, destination: &Destination) -> Outcome<ConnectionCheck> {
        self.call::<CheckRead>(
            "destinations/check_connection",
            &json!({ "destinationId": destination.id }),
        )
        .map(|r| ConnectionCheck {
            status: r.status,
            message: r.message,
        })
    }

    fn discover_source_schema(&self, source_id: &str) -> Outcome<Value> {
        let out = self.call::<DiscoverRead>(
            "sources/discover_schema",
            &json!({ "sourceId": source_id }),
        );
        match out.payload {
            Some(DiscoverRead {
                catalog: Some(catalog),
            }) => Outcome {
                ok: out.ok,
                payload: Some(catalog),
                message: out.message,
                status: out.status,
                http_status: out.http_status,
            },
            Some(DiscoverRead { catalog: None }) => {
                let mut failed = Outcome::failure(
                    StatusClass::Unrecognized,
                    "discover_schema response carried no catalog",
                );
                failed.http_status = out.http_status;
                failed
            }
            None => Outcome {
                ok: out.ok,
                payload: None,
                message: out.message,
                status: out.status,
                http_status: out.http_status,
            },
        }
    }
}
