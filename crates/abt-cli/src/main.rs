use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "abt")]
#[command(about = "Declarative configuration for data-integration deployments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply YAML to a deployment, or dump a deployment to YAML
    Sync {
        /// Deployment URL, or YAML file(s) (comma-separated, merged in order)
        origin: String,

        /// Deployment URL or YAML file (defaults to $ABT_URL)
        #[arg(long)]
        target: Option<String>,

        #[command(flatten)]
        kinds: KindFlags,

        /// Secrets document (kind -> connector type -> fields)
        #[arg(long)]
        secrets: Option<String>,

        /// Workspace slug
        #[arg(long, default_value = abt_gateway::DEFAULT_WORKSPACE_SLUG)]
        workspace: String,

        /// Delete the selected entity kinds before applying
        #[arg(long, default_value_t = false)]
        wipe: bool,

        /// Run connection checks after applying
        #[arg(long, default_value_t = false)]
        validate: bool,

        /// Write the deployment to this YAML file before any change
        #[arg(long)]
        backup: Option<String>,
    },

    /// Delete every selected entity in a deployment
    Wipe {
        /// Deployment URL (defaults to $ABT_URL)
        url: Option<String>,

        #[command(flatten)]
        kinds: KindFlags,

        #[arg(long, default_value = abt_gateway::DEFAULT_WORKSPACE_SLUG)]
        workspace: String,
    },

    /// Run connection checks for sources and destinations
    Validate {
        /// Deployment URL (defaults to $ABT_URL)
        url: Option<String>,

        /// Check sources
        #[arg(short = 's', long, default_value_t = false)]
        sources: bool,

        /// Check destinations
        #[arg(short = 'd', long, default_value_t = false)]
        destinations: bool,

        /// Check everything
        #[arg(short = 'a', long, default_value_t = false)]
        all: bool,

        #[arg(long, default_value = abt_gateway::DEFAULT_WORKSPACE_SLUG)]
        workspace: String,
    },

    /// Validate YAML offline and print its config hash
    CheckConfig {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

/// Entity kind selection. None set means all.
#[derive(Args, Clone, Copy, Debug)]
pub struct KindFlags {
    /// Sources
    #[arg(short = 's', long, default_value_t = false)]
    sources: bool,

    /// Destinations
    #[arg(short = 'd', long, default_value_t = false)]
    destinations: bool,

    /// Connections
    #[arg(short = 'c', long, default_value_t = false)]
    connections: bool,

    /// Everything
    #[arg(short = 'a', long, default_value_t = false)]
    all: bool,
}

impl KindFlags {
    fn selection(&self) -> abt_reconcile::KindSelection {
        if self.all {
            return abt_reconcile::KindSelection::ALL;
        }
        abt_reconcile::KindSelection::from_flags(self.sources, self.destinations, self.connections)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    // Dev convenience: load .env.local if present. Missing file is fine.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.cmd {
        Commands::Sync {
            origin,
            target,
            kinds,
            secrets,
            workspace,
            wipe,
            validate,
            backup,
        } => commands::sync::run_sync(commands::sync::SyncArgs {
            origin,
            target: commands::url_or_env(target),
            selection: kinds.selection(),
            secrets,
            workspace,
            wipe,
            validate,
            backup,
        }),

        Commands::Wipe {
            url,
            kinds,
            workspace,
        } => {
            let url = commands::require_url(url)?;
            commands::deployment::run_wipe(&url, &workspace, kinds.selection())
        }

        Commands::Validate {
            url,
            sources,
            destinations,
            all,
            workspace,
        } => {
            let url = commands::require_url(url)?;
            let selection = if all {
                abt_reconcile::KindSelection::ALL
            } else {
                abt_reconcile::KindSelection::from_flags(sources, destinations, false)
            };
            commands::deployment::run_validate(&url, &workspace, selection)
        }

        Commands::CheckConfig { paths } => commands::check_config(&paths),
    }
}
