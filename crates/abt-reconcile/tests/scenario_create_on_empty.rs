//! Declared source on an empty deployment, with secrets.
//!
//! GREEN when:
//! - the placeholder credential is replaced by the secret before the write;
//! - the reconciler issues a create (no match) and no update;
//! - the id returned by the deployment is in the snapshot afterwards.

use abt_config::{load_secrets_from_str, merge_secrets};
use abt_gateway::{Gateway, Operation};
use abt_gateway_memory::MemoryGateway;
use abt_model::{EntityCollection, EntityKind, Source};
use abt_reconcile::{fetch_snapshot, reconcile, KindSelection, Transition};
use serde_json::json;

#[test]
fn create_on_empty_snapshot_populates_id() {
    let gw = MemoryGateway::new().with_source_type("def-github", "GitHub");
    let ws = gw.get_workspace("default").unwrap();

    let mut declared = EntityCollection::new();
    let mut repo = Source::new("repo-sync", "GitHub");
    repo.definition_id = Some("def-github".to_string());
    repo.config = json!({"access_token": "***"}).as_object().cloned().unwrap();
    declared.sources.push(repo);

    let secrets = load_secrets_from_str("sources:\n  GitHub:\n    access_token: tok-123\n").unwrap();
    merge_secrets(Some(&secrets), &mut declared);
    assert_eq!(
        declared.sources.find_by_name("repo-sync").unwrap().config["access_token"],
        json!("tok-123")
    );

    let mut snapshot = fetch_snapshot(&gw, &ws).unwrap();
    assert!(snapshot.is_empty());

    let report = reconcile(&gw, &ws, &declared, &mut snapshot, KindSelection::ALL);

    assert!(!report.has_failures(), "{report}");
    assert_eq!(report.count(Transition::Created), 1);
    assert!(gw.calls_for(Operation::Update).is_empty());

    assert_eq!(snapshot.sources.resolve_id_by_name("repo-sync"), Some("src-0001"));
    let outcome = report.outcomes_of(EntityKind::Source).next().unwrap();
    assert_eq!(outcome.id.as_deref(), Some("src-0001"));
    assert_eq!(outcome.message, "Operation successful");

    // What reached the deployment carries the secret.
    assert_eq!(gw.sources()[0].config["access_token"], json!("tok-123"));
}

#[test]
fn second_run_updates_instead_of_creating() {
    let gw = MemoryGateway::new().with_source_type("def-github", "GitHub");
    let ws = gw.get_workspace("default").unwrap();

    let mut declared = EntityCollection::new();
    let mut repo = Source::new("repo-sync", "GitHub");
    repo.definition_id = Some("def-github".to_string());
    declared.sources.push(repo);

    let mut first = fetch_snapshot(&gw, &ws).unwrap();
    reconcile(&gw, &ws, &declared, &mut first, KindSelection::ALL);

    let mut second = fetch_snapshot(&gw, &ws).unwrap();
    let report = reconcile(&gw, &ws, &declared, &mut second, KindSelection::ALL);

    assert_eq!(report.count(Transition::Created), 0);
    assert_eq!(report.count(Transition::Updated), 1);
    assert_eq!(gw.sources().len(), 1);
}
