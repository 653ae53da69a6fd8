//! HTTP API: audit trigger, health checks and Prometheus metrics

use audit_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::AuditMetrics,
    render_text, AuditError, AuditOrchestrator, RenderOptions, SubAuditFailure,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AuditOrchestrator>,
    pub health_registry: HealthRegistry,
    pub metrics: AuditMetrics,
    pub default_namespace: String,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<AuditOrchestrator>,
        health_registry: HealthRegistry,
        metrics: AuditMetrics,
        default_namespace: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            health_registry,
            metrics,
            default_namespace: default_namespace.into(),
        }
    }
}

/// Report body format
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Text,
}

/// Query parameters for `GET /audit`
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub namespace: Option<String>,
    #[serde(default)]
    pub format: ReportFormat,
    /// Include non-significant workloads in the text rendering
    #[serde(default)]
    pub all: bool,
}

/// Body returned when no part of the audit could run
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub failures: Vec<SubAuditFailure>,
}

impl From<&AuditError> for ErrorResponse {
    fn from(e: &AuditError) -> Self {
        Self {
            error: e.to_string(),
            failures: e
                .sub_audit_errors()
                .into_iter()
                .map(|(sub_audit, err)| SubAuditFailure {
                    sub_audit,
                    error: err.to_string(),
                })
                .collect(),
        }
    }
}

/// Run an audit - returns the (possibly partial) report, or 502 when both
/// sub-audits failed
async fn audit(State(state): State<Arc<AppState>>, Query(query): Query<AuditQuery>) -> Response {
    let namespace = query
        .namespace
        .unwrap_or_else(|| state.default_namespace.clone());
    let started = Instant::now();

    match state.orchestrator.run_audit(&namespace).await {
        Ok(report) => {
            state
                .metrics
                .observe_audit_duration(started.elapsed().as_secs_f64());
            state.metrics.record_report(&report);
            state.health_registry.record_report(&report).await;

            let text = render_text(
                &report,
                state.orchestrator.config(),
                RenderOptions { show_all: query.all },
            );
            info!(event = "audit_report", namespace = %namespace, "\n{}", text);

            match query.format {
                ReportFormat::Json => (StatusCode::OK, Json(report)).into_response(),
                ReportFormat::Text => (
                    StatusCode::OK,
                    [("content-type", "text/plain; charset=utf-8")],
                    text,
                )
                    .into_response(),
            }
        }
        Err(e) => {
            error!(namespace = %namespace, error = %e, "Audit failed");
            state
                .metrics
                .observe_audit_duration(started.elapsed().as_secs_f64());
            state.metrics.record_failed_audit();
            state.health_registry.record_failed_audit(e.to_string()).await;

            (StatusCode::BAD_GATEWAY, Json(ErrorResponse::from(&e))).into_response()
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/audit", get(audit))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
