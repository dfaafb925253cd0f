//! CLI paths that never reach a deployment.
//!
//! GREEN when:
//! - `abt check-config` prints the config hash and exits 0 on a valid document;
//! - an invalid document exits 2 and names every missing field;
//! - a literal credential in the document is refused without echoing it;
//! - `abt sync` with an ambiguous origin/target fails before any remote call;
//! - an invalid document given to `abt sync` exits 2 without connecting.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

const VALID: &str = r#"
sources:
  - name: superset
    sourceName: GitHub
    connectionConfiguration: {access_token: "***"}
destinations:
  - name: rds
    destinationName: Postgres
    connectionConfiguration: {password: "***"}
connections:
  - name: superset-to-rds
    sourceName: superset
    destinationName: rds
    schedule: {units: 24, timeUnit: hours}
    status: active
"#;

const MISSING_FIELDS: &str = r#"
sources:
  - name: superset
destinations:
  - name: rds
    destinationName: Postgres
    connectionConfiguration: {}
"#;

fn abt() -> Command {
    let mut cmd = Command::cargo_bin("abt").unwrap();
    cmd.env_remove("ABT_URL").env("RUST_LOG", "error");
    cmd
}

fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn check_config_accepts_valid_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "config.yml", VALID);

    abt()
        .args(["check-config", &path])
        .assert()
        .success()
        .stdout(predicate::str::contains("config_hash="))
        .stdout(predicate::str::contains("config_valid=true"));
}

#[test]
fn check_config_reports_missing_fields_with_exit_2() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "config.yml", MISSING_FIELDS);

    abt()
        .args(["check-config", &path])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("/sources/0/sourceName"))
        .stderr(predicate::str::contains("/sources/0/connectionConfiguration"))
        .stdout(predicate::str::contains("config_valid=false"));
}

#[test]
fn literal_credential_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "config.yml",
        "sources:\n  - name: s\n    sourceName: GitHub\n    connectionConfiguration:\n      access_token: ghp_realtokenvalue123\n",
    );

    abt()
        .args(["check-config", &path])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("ghp_realtokenvalue123").not());
}

#[test]
fn sync_yaml_to_yaml_is_ambiguous() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "a.yml", VALID);
    let b = dir.path().join("b.yml").to_string_lossy().into_owned();

    abt()
        .args(["sync", &a, "--target", &b])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous origin/target specification"));
}

#[test]
fn sync_invalid_document_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "config.yml", MISSING_FIELDS);

    // Port 1: nothing listens there. Validation must stop the run first.
    abt()
        .args(["sync", &path, "--target", "http://127.0.0.1:1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nothing was changed"));
}

#[test]
fn wipe_without_url_fails() {
    abt()
        .args(["wipe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ABT_URL"));
}
