//! `abt sync`: YAML -> deployment (apply) or deployment -> YAML (dump).

use std::process::ExitCode;

use abt_config::{load_secrets, merge_secrets, write_yaml, DeclaredConfigBuilder};
use abt_gateway::Gateway;
use abt_reconcile::{
    check_connectors, fetch_snapshot, reconcile, wipe, KindSelection, RunReport,
};
use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use super::{connect, finish, is_url, is_yaml_path, print_validation, EXIT_FAILURES};

pub struct SyncArgs {
    pub origin: String,
    pub target: Option<String>,
    pub selection: KindSelection,
    pub secrets: Option<String>,
    pub workspace: String,
    pub wipe: bool,
    pub validate: bool,
    pub backup: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Direction {
    /// YAML files (merged in order) -> deployment URL.
    Apply { yaml: Vec<String>, url: String },
    /// Deployment URL -> one YAML file.
    Dump { url: String, yaml: String },
}

fn direction(origin: &str, target: Option<&str>) -> Result<Direction> {
    let Some(target) = target else {
        bail!("ambiguous origin/target specification: no target given");
    };
    let origin_yaml: Vec<String> = origin
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if is_url(target) && !origin_yaml.is_empty() && origin_yaml.iter().all(|p| is_yaml_path(p)) {
        return Ok(Direction::Apply {
            yaml: origin_yaml,
            url: target.to_string(),
        });
    }
    if is_url(origin) && is_yaml_path(target) {
        return Ok(Direction::Dump {
            url: origin.to_string(),
            yaml: target.to_string(),
        });
    }
    bail!("ambiguous origin/target specification: origin={origin} target={target}")
}

pub fn run_sync(args: SyncArgs) -> Result<ExitCode> {
    match direction(&args.origin, args.target.as_deref())? {
        Direction::Dump { url, yaml } => {
            let (gateway, workspace) = connect(&url, &args.workspace)?;
            let snapshot =
                fetch_snapshot(&gateway, &workspace).context("listing deployment failed")?;
            write_yaml(&snapshot, &yaml)?;
            println!("written={yaml}");
            Ok(ExitCode::SUCCESS)
        }
        Direction::Apply { yaml, url } => apply(&yaml, &url, &args),
    }
}

fn apply(yaml: &[String], url: &str, args: &SyncArgs) -> Result<ExitCode> {
    // Everything that can be fatal happens before the first mutation.
    let path_refs: Vec<&str> = yaml.iter().map(|s| s.as_str()).collect();
    let loaded = abt_config::load_layered_yaml(&path_refs)?;
    info!(config_hash = %loaded.config_hash, files = yaml.len(), "declarative document loaded");

    let validation = abt_config::validate_document(&loaded.config_json);
    if !print_validation(&validation) {
        eprintln!("declarative document is invalid; nothing was changed");
        return Ok(ExitCode::from(EXIT_FAILURES));
    }
    let document = loaded.document()?;

    let (gateway, workspace) = connect(url, &args.workspace)?;
    let builder = DeclaredConfigBuilder::new(
        &gateway
            .list_source_types()
            .context("listing source types failed")?,
        &gateway
            .list_destination_types()
            .context("listing destination types failed")?,
    );
    let mut declared = builder.build(&document);

    let secrets = match &args.secrets {
        Some(path) => load_secrets(path)?,
        None => None,
    };
    let stats = merge_secrets(secrets.as_ref(), &mut declared);
    if secrets.is_some() {
        info!(entities = stats.entities, fields = stats.fields, "secrets merged");
    }

    let mut snapshot = fetch_snapshot(&gateway, &workspace).context("listing deployment failed")?;

    if let Some(path) = &args.backup {
        write_yaml(&snapshot, path)?;
    }

    let mut report = RunReport::new();
    if args.wipe {
        warn!("wiping selected kinds before apply");
        report.extend(wipe(&gateway, &mut snapshot, args.selection));
    }
    report.extend(reconcile(
        &gateway,
        &workspace,
        &declared,
        &mut snapshot,
        args.selection,
    ));
    if args.validate {
        report.extend(check_connectors(&gateway, &snapshot, args.selection));
    }

    Ok(finish(&report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_to_url_applies() {
        let d = direction("base.yml,prod.yaml", Some("http://localhost:8000")).unwrap();
        assert_eq!(
            d,
            Direction::Apply {
                yaml: vec!["base.yml".to_string(), "prod.yaml".to_string()],
                url: "http://localhost:8000".to_string(),
            }
        );
    }

    #[test]
    fn url_to_yaml_dumps() {
        let d = direction("http://localhost:8000", Some("backup.yml")).unwrap();
        assert!(matches!(d, Direction::Dump { .. }));
    }

    #[test]
    fn anything_else_is_ambiguous() {
        for (origin, target) in [
            ("a.yml", Some("b.yml")),
            ("http://a", Some("http://b")),
            ("a.json", Some("http://b")),
            ("a.yml", None),
        ] {
            let err = direction(origin, target).unwrap_err().to_string();
            assert!(err.contains("ambiguous origin/target specification"), "{err}");
        }
    }
}
