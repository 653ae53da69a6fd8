//! Observability infrastructure for the waste audit
//!
//! Provides:
//! - Prometheus metrics (audit latency, workloads evaluated, orphan claims, waste totals)
//! - Structured JSON logging with tracing

use crate::models::{AuditReport, AuditWarning, OrphanRecord, SubAudit, WasteRecord};
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, Gauge, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for audit latency (in seconds); dominated by API round trips
const AUDIT_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AuditMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AuditMetricsInner {
    audit_duration_seconds: Histogram,
    audits_total: IntCounter,
    sub_audit_failures: IntCounterVec,
    workloads_evaluated: IntGauge,
    orphan_claims: IntGauge,
    cluster_waste_usd: Gauge,
    orphan_waste_usd: Gauge,
    warnings: IntCounterVec,
}

impl AuditMetricsInner {
    fn new() -> Self {
        Self {
            audit_duration_seconds: register_histogram!(
                "kubegreen_audit_duration_seconds",
                "Time spent running a full namespace audit",
                AUDIT_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register audit_duration_seconds"),

            audits_total: register_int_counter!(
                "kubegreen_audits_total",
                "Total number of audits run"
            )
            .expect("Failed to register audits_total"),

            sub_audit_failures: register_int_counter_vec!(
                "kubegreen_sub_audit_failures_total",
                "Total number of failed compute or storage sub-audits",
                &["sub_audit"]
            )
            .expect("Failed to register sub_audit_failures"),

            workloads_evaluated: register_int_gauge!(
                "kubegreen_workloads_evaluated",
                "Number of workloads evaluated by the last audit"
            )
            .expect("Failed to register workloads_evaluated"),

            orphan_claims: register_int_gauge!(
                "kubegreen_orphan_claims",
                "Number of orphaned storage claims found by the last audit"
            )
            .expect("Failed to register orphan_claims"),

            cluster_waste_usd: register_gauge!(
                "kubegreen_cluster_waste_usd",
                "Estimated monthly compute waste found by the last audit"
            )
            .expect("Failed to register cluster_waste_usd"),

            orphan_waste_usd: register_gauge!(
                "kubegreen_orphan_waste_usd",
                "Estimated monthly cost of orphaned claims found by the last audit"
            )
            .expect("Failed to register orphan_waste_usd"),

            warnings: register_int_counter_vec!(
                "kubegreen_audit_warnings_total",
                "Total number of missing-request and malformed-field warnings",
                &["kind"]
            )
            .expect("Failed to register warnings"),
        }
    }
}

/// Audit metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AuditMetrics {
    _private: (),
}

impl Default for AuditMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AuditMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AuditMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record an audit latency observation
    pub fn observe_audit_duration(&self, duration_secs: f64) {
        self.inner().audit_duration_seconds.observe(duration_secs);
    }

    /// Record a completed (possibly partial) audit
    pub fn record_report(&self, report: &AuditReport) {
        let inner = self.inner();
        inner.audits_total.inc();
        inner.workloads_evaluated.set(report.waste_records.len() as i64);
        inner.orphan_claims.set(report.orphan_records.len() as i64);
        inner.cluster_waste_usd.set(report.cluster_total_usd);
        inner.orphan_waste_usd.set(report.orphan_total_usd());

        for warning in &report.warnings {
            inner.warnings.with_label_values(&[warning.kind()]).inc();
        }
        for failure in &report.failures {
            self.inc_sub_audit_failure(failure.sub_audit);
        }
    }

    /// Record an audit where both halves failed
    pub fn record_failed_audit(&self) {
        self.inner().audits_total.inc();
        self.inc_sub_audit_failure(SubAudit::Compute);
        self.inc_sub_audit_failure(SubAudit::Storage);
    }

    fn inc_sub_audit_failure(&self, sub_audit: SubAudit) {
        self.inner()
            .sub_audit_failures
            .with_label_values(&[&sub_audit.to_string()])
            .inc();
    }
}

/// Structured logger for audit events
///
/// Provides consistent JSON-formatted logging for findings, warnings and
/// audit lifecycle events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log the start of an audit run
    pub fn log_audit_started(&self, namespace: &str) {
        info!(
            event = "audit_started",
            instance = %self.instance,
            namespace = %namespace,
            "Starting waste audit"
        );
    }

    /// Log a missing-request or malformed-field warning
    pub fn log_warning(&self, namespace: &str, warning: &AuditWarning) {
        match warning {
            AuditWarning::MissingRequest { workload, resource } => {
                warn!(
                    event = "missing_cpu_request",
                    instance = %self.instance,
                    namespace = %namespace,
                    workload = %workload,
                    resource = %resource,
                    "Workload has no request set, assuming the default"
                );
            }
            AuditWarning::MalformedField {
                workload,
                resource,
                field,
                raw,
            } => {
                warn!(
                    event = "malformed_field",
                    instance = %self.instance,
                    namespace = %namespace,
                    workload = %workload,
                    resource = %resource,
                    field = %field,
                    raw = %raw,
                    "Unreadable resource quantity treated as 0"
                );
            }
        }
    }

    /// Log a workload's waste estimate
    pub fn log_workload_waste(&self, namespace: &str, record: &WasteRecord) {
        debug!(
            event = "workload_waste",
            instance = %self.instance,
            namespace = %namespace,
            workload = %record.name,
            cpu_cost_usd = record.cpu_cost_usd,
            ram_cost_usd = record.ram_cost_usd,
            total_cost_usd = record.total_cost_usd,
            severity = %record.severity,
            "Estimated workload waste"
        );
    }

    /// Log an orphaned claim
    pub fn log_orphan_claim(&self, namespace: &str, orphan: &OrphanRecord) {
        info!(
            event = "orphan_claim",
            instance = %self.instance,
            namespace = %namespace,
            claim = %orphan.name,
            declared_size = ?orphan.declared_size,
            estimated_monthly_cost_usd = orphan.estimated_monthly_cost_usd,
            "Orphaned storage claim found"
        );
    }

    /// Log a sub-audit that could not complete
    pub fn log_sub_audit_failed(&self, namespace: &str, sub_audit: SubAudit, error: &str) {
        warn!(
            event = "sub_audit_failed",
            instance = %self.instance,
            namespace = %namespace,
            sub_audit = %sub_audit,
            error = %error,
            "Sub-audit failed"
        );
    }

    /// Log audit completion
    pub fn log_audit_completed(&self, report: &AuditReport, duration_secs: f64) {
        info!(
            event = "audit_completed",
            instance = %self.instance,
            namespace = %report.namespace,
            workloads = report.waste_records.len(),
            orphan_claims = report.orphan_records.len(),
            cluster_total_usd = report.cluster_total_usd,
            warnings = report.warnings.len(),
            partial = report.is_partial(),
            duration_secs = duration_secs,
            "Waste audit completed"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, namespace: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            namespace = %namespace,
            "KubeGreen audit service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "KubeGreen audit service shutting down"
        );
    }
}
