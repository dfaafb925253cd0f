//! Deployment-only commands: `abt wipe` and `abt validate`.

use std::process::ExitCode;

use abt_reconcile::{check_connectors, fetch_snapshot, wipe, KindSelection};
use anyhow::{Context, Result};

use super::{connect, finish};

pub fn run_wipe(url: &str, slug: &str, selection: KindSelection) -> Result<ExitCode> {
    let (gateway, workspace) = connect(url, slug)?;
    let mut snapshot = fetch_snapshot(&gateway, &workspace).context("listing deployment failed")?;
    let report = wipe(&gateway, &mut snapshot, selection);
    Ok(finish(&report))
}

pub fn run_validate(url: &str, slug: &str, selection: KindSelection) -> Result<ExitCode> {
    let (gateway, workspace) = connect(url, slug)?;
    let snapshot = fetch_snapshot(&gateway, &workspace).context("listing deployment failed")?;
    let report = check_connectors(&gateway, &snapshot, selection);
    Ok(finish(&report))
}
