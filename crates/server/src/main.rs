//! KubeGreen server - namespace waste audit service
//!
//! Runs in or against a Kubernetes cluster and audits a namespace for
//! compute and storage waste whenever `GET /audit` is called.

use anyhow::{Context, Result};
use audit_lib::{
    health::{components, HealthRegistry},
    observability::{AuditMetrics, StructuredLogger},
    AuditOrchestrator, KubeClusterSource,
};
use kubegreen_server::{api, config::ServerConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting kubegreen-server");

    let config = ServerConfig::load()?;
    info!(namespace = %config.namespace, port = config.api_port, "Server configured");

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CLUSTER_CLIENT).await;
    health_registry.register(components::COMPUTE_AUDIT).await;
    health_registry.register(components::STORAGE_AUDIT).await;

    let source = match &config.kubeconfig {
        Some(path) => {
            KubeClusterSource::from_kubeconfig(Path::new(path), config.context.as_deref()).await
        }
        None => KubeClusterSource::infer().await,
    };
    let source = match source {
        Ok(source) => source,
        Err(e) => {
            health_registry
                .set_unhealthy(components::CLUSTER_CLIENT, e.to_string())
                .await;
            return Err(e).context("Failed to create Kubernetes client");
        }
    };

    let metrics = AuditMetrics::new();
    let logger = StructuredLogger::new("kubegreen-server");
    logger.log_startup(SERVER_VERSION, &config.namespace);

    let orchestrator = AuditOrchestrator::new(Arc::new(source), config.audit.clone())
        .with_logger(logger.clone());

    let app_state = Arc::new(api::AppState::new(
        Arc::new(orchestrator),
        health_registry.clone(),
        metrics,
        config.namespace.clone(),
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => {
                    logger.log_shutdown("API server task panicked");
                    return Err(e.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
