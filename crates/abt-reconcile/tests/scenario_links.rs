//! Link reconciliation.
//!
//! GREEN when:
//! - links declared by name are created against sources/destinations created
//!   earlier in the same run;
//! - a link created without a declared catalog gets the discovered one;
//! - updating a link with no declared catalog keeps the deployment's catalog;
//! - an unresolved reference fails that link only;
//! - a blank link name never matches a deployment link;
//! - a link declared without a name is created under its endpoint name and
//!   matched by it on the next run.

use abt_config::{load_layered_yaml_from_strings, DeclaredConfigBuilder};
use abt_gateway::{Gateway, Operation, StatusClass};
use abt_gateway_memory::MemoryGateway;
use abt_model::{Destination, EntityCollection, EntityKind, EntityRef, Link, LinkStatus, Source};
use abt_reconcile::{
    fetch_snapshot, reconcile, ConfigIssue, FailureCause, KindSelection, Transition,
};
use serde_json::json;

const DOC: &str = r#"
sources:
  - name: superset
    sourceName: GitHub
    connectionConfiguration: {repository: apache/superset}
destinations:
  - name: rds
    destinationName: Postgres
    connectionConfiguration: {host: db.internal}
connections:
  - name: superset-to-rds
    sourceName: superset
    destinationName: rds
    schedule: {units: 24, timeUnit: hours}
    status: active
"#;

fn gateway() -> MemoryGateway {
    MemoryGateway::new()
        .with_source_type("def-github", "GitHub")
        .with_destination_type("def-pg", "Postgres")
}

fn declared(gw: &MemoryGateway, doc: &str) -> EntityCollection {
    let doc = load_layered_yaml_from_strings(&[doc]).unwrap().document().unwrap();
    DeclaredConfigBuilder::new(
        &gw.list_source_types().unwrap(),
        &gw.list_destination_types().unwrap(),
    )
    .build(&doc)
}

#[test]
fn links_resolve_names_created_in_the_same_run() {
    let gw = gateway();
    let ws = gw.get_workspace("default").unwrap();
    let declared = declared(&gw, DOC);

    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);

    assert!(!report.has_failures(), "{report}");
    assert_eq!(report.count(Transition::Created), 3);

    let order: Vec<EntityKind> = report.outcomes.iter().map(|o| o.kind).collect();
    assert_eq!(
        order,
        vec![EntityKind::Source, EntityKind::Destination, EntityKind::Link]
    );

    let link = &gw.links()[0];
    assert_eq!(link.source.id.as_deref(), Some("src-0001"));
    assert_eq!(link.destination.id.as_deref(), Some("dst-0001"));
    assert_eq!(link.schedule, Some(json!({"units": 24, "timeUnit": "hours"})));
    // Discovered, since none was declared.
    assert_eq!(
        link.sync_catalog,
        Some(json!({"streams": [{"stream": {"name": "default"}}]}))
    );
    assert_eq!(gw.calls_for(Operation::Discover).len(), 1);
}

#[test]
fn empty_declared_catalog_does_not_clear_deployment_catalog() {
    let gw = gateway();
    let ws = gw.get_workspace("default").unwrap();
    let src = gw.seed_source(Source::new("superset", "GitHub"));
    let dst = gw.seed_destination(Destination::new("rds", "Postgres"));
    let catalog = json!({"streams": [{"stream": {"name": "issues"}, "config": {"selected": true}}]});
    gw.seed_link(Link {
        sync_catalog: Some(catalog.clone()),
        status: LinkStatus::Inactive,
        ..Link::new("superset-to-rds", EntityRef::by_id(&src), EntityRef::by_id(&dst))
    });

    let mut declared = EntityCollection::new();
    declared.links.push(Link {
        sync_catalog: Some(json!({"streams": []})),
        status: LinkStatus::Active,
        ..Link::new(
            "superset-to-rds",
            EntityRef::by_name("superset"),
            EntityRef::by_name("rds"),
        )
    });

    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);

    assert_eq!(report.count(Transition::Updated), 1);
    let stored = &gw.links()[0];
    assert_eq!(stored.sync_catalog, Some(catalog));
    assert_eq!(stored.status, LinkStatus::Active);
    assert!(gw.calls_for(Operation::Discover).is_empty());
}

#[test]
fn unresolved_reference_fails_that_link_only() {
    let gw = gateway();
    let ws = gw.get_workspace("default").unwrap();
    let doc = format!(
        "{DOC}  - name: orphan\n    sourceName: no-such-source\n    destinationName: rds\n    schedule: {{units: 1, timeUnit: hours}}\n    status: active\n"
    );
    let declared = declared(&gw, &doc);

    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);

    assert_eq!(report.count(Transition::Created), 3);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.name, "orphan");
    assert_eq!(failure.operation, Operation::Create);
    assert_eq!(
        failure.cause,
        FailureCause::Config(ConfigIssue::UnresolvedReference {
            side: EntityKind::Source,
            reference: "no-such-source".to_string(),
        })
    );
    assert_eq!(gw.links().len(), 1);
}

#[test]
fn failed_discovery_is_reported_as_discover() {
    let gw = gateway();
    let ws = gw.get_workspace("default").unwrap();
    gw.seed_source(Source::new("flaky", "GitHub"));
    gw.seed_destination(Destination::new("rds", "Postgres"));
    gw.fail_on("flaky", StatusClass::Unrecognized, "discover timed out");

    let mut declared = EntityCollection::new();
    declared.links.push(Link::new(
        "flaky-to-rds",
        EntityRef::by_name("flaky"),
        EntityRef::by_name("rds"),
    ));

    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].operation, Operation::Discover);
    assert!(matches!(report.failures[0].cause, FailureCause::Remote(_)));
    assert!(gw.links().is_empty());
}

fn seed_unnamed_unrelated_link(gw: &MemoryGateway) -> Link {
    let other_src = gw.seed_source(Source::new("other-src", "GitHub"));
    let other_dst = gw.seed_destination(Destination::new("other-dst", "Postgres"));
    gw.seed_link(Link {
        status: LinkStatus::Inactive,
        ..Link::new("", EntityRef::by_id(&other_src), EntityRef::by_id(&other_dst))
    });
    gw.links()[0].clone()
}

#[test]
fn blank_name_does_not_match_unrelated_link() {
    let gw = gateway();
    let ws = gw.get_workspace("default").unwrap();
    let untouched = seed_unnamed_unrelated_link(&gw);
    gw.seed_source(Source::new("superset", "GitHub"));
    gw.seed_destination(Destination::new("rds", "Postgres"));

    let mut declared = EntityCollection::new();
    declared.links.push(Link {
        status: LinkStatus::Active,
        schedule: Some(json!({"units": 1, "timeUnit": "hours"})),
        ..Link::new("", EntityRef::by_name("superset"), EntityRef::by_name("rds"))
    });

    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);

    assert_eq!(report.count(Transition::Updated), 0);
    assert!(gw.calls_for(Operation::Update).is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].cause,
        FailureCause::Config(ConfigIssue::MissingField { field: "name" })
    );
    assert_eq!(gw.links(), vec![untouched]);
}

#[test]
fn unnamed_declared_link_gets_endpoint_name() {
    let gw = gateway();
    let ws = gw.get_workspace("default").unwrap();
    seed_unnamed_unrelated_link(&gw);
    let doc = DOC.replace(
        "  - name: superset-to-rds\n    sourceName: superset",
        "  - sourceName: superset",
    );
    let declared = declared(&gw, &doc);
    assert_eq!(
        declared.links.iter().next().map(|l| l.name.as_str()),
        Some("superset -> rds")
    );

    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);
    assert!(!report.has_failures(), "{report}");
    assert_eq!(report.count(Transition::Created), 3);
    assert_eq!(report.count(Transition::Updated), 0);
    assert_eq!(gw.links().len(), 2);

    // Second run: matched by the derived name.
    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);
    assert_eq!(report.count(Transition::Created), 0);
    assert_eq!(report.count(Transition::Updated), 3);
    assert_eq!(gw.links().len(), 2);
}
