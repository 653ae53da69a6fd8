//! KubeGreen CLI
//!
//! Audits a Kubernetes namespace for idle compute and orphaned storage,
//! either in-process against the current kubeconfig or through a running
//! kubegreen-server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use audit_lib::AuditConfig;
use clap::{Parser, Subcommand};
use commands::audit::{self, LocalTarget};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// KubeGreen CLI
#[derive(Parser)]
#[command(name = "kgreen")]
#[command(author, version, about = "CLI for KubeGreen namespace waste audits", long_about = None)]
pub struct Cli {
    /// Server URL for `trigger` (can also be set via KGREEN_API_URL env var)
    #[arg(long, env = "KGREEN_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Path to kubeconfig file (KUBECONFIG or ~/.kube/config if not specified)
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit a namespace from this machine
    Audit {
        /// Namespace to audit
        #[arg(long, short, env = "KGREEN_NAMESPACE")]
        namespace: Option<String>,

        /// List every workload, not only those with meaningful waste
        #[arg(long)]
        all: bool,

        /// Kubeconfig context to use
        #[arg(long)]
        context: Option<String>,

        /// Audit a saved JSON snapshot instead of a live cluster
        #[arg(long, conflicts_with = "context")]
        snapshot: Option<PathBuf>,

        /// Flag every claim as orphaned when pod volume bindings cannot be read
        #[arg(long)]
        allow_degraded_storage: bool,
    },

    /// Ask a running kubegreen-server to audit a namespace
    Trigger {
        /// Namespace to audit (server default if not specified)
        #[arg(long, short, env = "KGREEN_NAMESPACE")]
        namespace: Option<String>,

        /// List every workload, not only those with meaningful waste
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let file_config = config::Config::load()?;

    match cli.command {
        Commands::Audit {
            namespace,
            all,
            context,
            snapshot,
            allow_degraded_storage,
        } => {
            let target = match snapshot {
                Some(path) => LocalTarget::Snapshot(path),
                None => LocalTarget::Cluster {
                    kubeconfig: cli.kubeconfig,
                    context: context.or_else(|| file_config.context.clone()),
                },
            };
            let audit_config = AuditConfig {
                allow_degraded_storage,
                ..AuditConfig::default()
            };
            let namespace = file_config.namespace(namespace);

            audit::run_local(target, &namespace, audit_config, all, cli.format).await?;
        }
        Commands::Trigger { namespace, all } => {
            let client = client::ApiClient::new(&file_config.api_url(cli.api_url))?;
            let namespace = namespace.or_else(|| file_config.default_namespace.clone());

            audit::trigger(&client, namespace.as_deref(), all, cli.format).await?;
        }
    }

    Ok(())
}
