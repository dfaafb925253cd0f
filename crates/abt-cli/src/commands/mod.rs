//! Command handler modules for abt-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod deployment;
pub mod sync;

use std::process::ExitCode;

use abt_config::ValidationReport;
use abt_gateway::{Gateway, HttpGateway, Workspace};
use abt_reconcile::RunReport;
use anyhow::{Context, Result};
use tracing::info;

/// Deployment URL fallback when none is given on the command line.
pub const ENV_URL: &str = "ABT_URL";

/// Exit status for a run that finished with per-entity failures, or for an
/// invalid declarative document.
const EXIT_FAILURES: u8 = 2;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub fn url_or_env(url: Option<String>) -> Option<String> {
    url.or_else(|| {
        std::env::var(ENV_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
    })
}

pub fn require_url(url: Option<String>) -> Result<String> {
    url_or_env(url).with_context(|| format!("no deployment URL given and {ENV_URL} is not set"))
}

pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

pub fn is_yaml_path(s: &str) -> bool {
    s.ends_with(".yml") || s.ends_with(".yaml")
}

/// Connect and resolve the workspace. Failure here is fatal.
pub fn connect(url: &str, slug: &str) -> Result<(HttpGateway, Workspace)> {
    let gateway = HttpGateway::new(url);
    let workspace = gateway
        .get_workspace(slug)
        .with_context(|| format!("cannot reach workspace '{slug}' at {url}"))?;
    info!(%url, workspace = %workspace.slug, workspace_id = %workspace.id, "connected");
    Ok((gateway, workspace))
}

/// Print the report and map it to an exit status.
pub fn finish(report: &RunReport) -> ExitCode {
    print!("{report}");
    if report.has_failures() {
        ExitCode::from(EXIT_FAILURES)
    } else {
        ExitCode::SUCCESS
    }
}

/// Print warnings and errors. Returns true when the document is usable.
pub fn print_validation(report: &ValidationReport) -> bool {
    for w in &report.warnings {
        eprintln!("WARN: {w}");
    }
    for e in &report.errors {
        eprintln!("INVALID: {e}");
    }
    report.is_valid()
}

// ---------------------------------------------------------------------------
// check-config
// ---------------------------------------------------------------------------

pub fn check_config(paths: &[String]) -> Result<ExitCode> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = abt_config::load_layered_yaml(&path_refs)?;
    println!("config_hash={}", loaded.config_hash);

    let validation = abt_config::validate_document(&loaded.config_json);
    if !print_validation(&validation) {
        println!("config_valid=false errors={}", validation.errors.len());
        return Ok(ExitCode::from(EXIT_FAILURES));
    }
    // Typed parse catches what presence checks cannot (e.g. wrong value types).
    loaded.document()?;
    println!("config_valid=true warnings={}", validation.warnings.len());
    Ok(ExitCode::SUCCESS)
}
