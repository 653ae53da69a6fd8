//! Audit CLI commands

use anyhow::{Context, Result};
use audit_lib::{
    source::ClusterSource, AuditConfig, AuditOrchestrator, KubeClusterSource,
    SnapshotSource,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::client::{ApiClient, ApiError};
use crate::output::{print_error, print_report, OutputFormat};

/// Where a local audit reads the cluster from
pub enum LocalTarget {
    /// Live cluster; an explicit kubeconfig file and context when given
    Cluster {
        kubeconfig: Option<PathBuf>,
        context: Option<String>,
    },
    /// Saved inventory, no cluster access
    Snapshot(PathBuf),
}

/// How the kube client gets its configuration
#[derive(Debug, PartialEq)]
enum Connection {
    /// In-cluster config or the default kubeconfig, as kube resolves it
    Infer,
    /// Default kubeconfig with a named context
    Context(String),
    /// A specific kubeconfig file
    File {
        path: PathBuf,
        context: Option<String>,
    },
}

fn connection(kubeconfig: Option<PathBuf>, context: Option<String>) -> Connection {
    match (kubeconfig, context) {
        (Some(path), context) => Connection::File { path, context },
        (None, Some(context)) => Connection::Context(context),
        (None, None) => Connection::Infer,
    }
}

async fn connect(connection: Connection) -> Result<KubeClusterSource> {
    match connection {
        Connection::Infer => KubeClusterSource::infer()
            .await
            .context("Failed to create Kubernetes client"),
        Connection::Context(context) => KubeClusterSource::from_default_kubeconfig(&context)
            .await
            .with_context(|| format!("Failed to load kubeconfig context {}", context)),
        Connection::File { path, context } => {
            KubeClusterSource::from_kubeconfig(&path, context.as_deref())
                .await
                .with_context(|| format!("Failed to load kubeconfig {}", path.display()))
        }
    }
}

/// Run an audit in-process
pub async fn run_local(
    target: LocalTarget,
    namespace: &str,
    config: AuditConfig,
    show_all: bool,
    format: OutputFormat,
) -> Result<()> {
    let source: Arc<dyn ClusterSource> = match target {
        LocalTarget::Snapshot(path) => Arc::new(SnapshotSource::from_file(&path)?),
        LocalTarget::Cluster {
            kubeconfig,
            context,
        } => Arc::new(connect(connection(kubeconfig, context)).await?),
    };

    let orchestrator = AuditOrchestrator::new(source, config);
    match orchestrator.run_audit(namespace).await {
        Ok(report) => print_report(&report, orchestrator.config(), show_all, format),
        Err(e) => {
            for (sub_audit, error) in e.sub_audit_errors() {
                print_error(&format!("{} audit failed: {}", sub_audit, error));
            }
            Err(e.into())
        }
    }
}

/// Ask a running server to audit a namespace
pub async fn trigger(
    client: &ApiClient,
    namespace: Option<&str>,
    show_all: bool,
    format: OutputFormat,
) -> Result<()> {
    match client.trigger_audit(namespace).await {
        // Significance uses the default thresholds; the server's are not exposed
        Ok(report) => print_report(&report, &AuditConfig::default(), show_all, format),
        Err(e) => {
            if let Some(ApiError::AuditFailed(response)) = e.downcast_ref::<ApiError>() {
                for failure in &response.failures {
                    print_error(&format!("{} audit failed: {}", failure.sub_audit, failure.error));
                }
            }
            Err(e)
        }
    }
}
