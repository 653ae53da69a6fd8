//! Audit orchestration
//!
//! Runs the compute and storage sub-audits for one namespace and assembles
//! the report. The two halves are independent: one failing never prevents
//! the other from reporting.

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::estimator::{ComputeEstimator, OrphanDetector};
use crate::models::{
    AuditReport, AuditWarning, OrphanRecord, SubAudit, SubAuditFailure, WasteRecord,
};
use crate::observability::StructuredLogger;
use crate::source::{ClusterSource, WorkloadWithUsage};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Result of the compute half of an audit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeAudit {
    /// One record per workload, in input order
    pub records: Vec<WasteRecord>,
    pub warnings: Vec<AuditWarning>,
    pub total_usd: f64,
}

/// Runs audits against a cluster source
///
/// Holds no per-run state, so one orchestrator can serve overlapping audits.
pub struct AuditOrchestrator {
    source: Arc<dyn ClusterSource>,
    estimator: ComputeEstimator,
    detector: OrphanDetector,
    logger: StructuredLogger,
}

impl AuditOrchestrator {
    pub fn new(source: Arc<dyn ClusterSource>, config: AuditConfig) -> Self {
        Self {
            source,
            detector: OrphanDetector::new(&config),
            estimator: ComputeEstimator::new(config),
            logger: StructuredLogger::new("kubegreen"),
        }
    }

    /// Use a specific logger instance label
    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &AuditConfig {
        self.estimator.config()
    }

    /// Audit one namespace
    ///
    /// Returns a report that may be partial; fails only when both the compute
    /// and the storage sub-audit fail.
    pub async fn run_audit(&self, namespace: &str) -> Result<AuditReport, AuditError> {
        let started = Instant::now();
        self.logger.log_audit_started(namespace);

        let (compute, storage) =
            tokio::join!(self.audit_compute(namespace), self.audit_storage(namespace));

        let mut failures = Vec::new();
        let (compute, storage) = match (compute, storage) {
            (Err(compute), Err(storage)) => {
                self.logger
                    .log_sub_audit_failed(namespace, SubAudit::Compute, &compute.to_string());
                self.logger
                    .log_sub_audit_failed(namespace, SubAudit::Storage, &storage.to_string());
                return Err(AuditError::AuditFailed {
                    namespace: namespace.to_string(),
                    compute: Box::new(compute),
                    storage: Box::new(storage),
                });
            }
            (compute, storage) => (
                self.settle(namespace, SubAudit::Compute, compute, &mut failures),
                self.settle(namespace, SubAudit::Storage, storage, &mut failures),
            ),
        };

        let compute = compute.unwrap_or_default();
        let report = AuditReport {
            namespace: namespace.to_string(),
            generated_at: Utc::now(),
            waste_records: compute.records,
            orphan_records: storage.unwrap_or_default(),
            cluster_total_usd: compute.total_usd,
            warnings: compute.warnings,
            failures,
        };

        self.logger
            .log_audit_completed(&report, started.elapsed().as_secs_f64());
        Ok(report)
    }

    /// Estimate every workload, keeping input order
    pub fn estimate_all(&self, namespace: &str, workloads: &[WorkloadWithUsage]) -> ComputeAudit {
        workloads
            .iter()
            .fold(ComputeAudit::default(), |mut audit, (unit, sample)| {
                let estimate = self.estimator.estimate(unit, sample.as_ref());
                for warning in &estimate.warnings {
                    self.logger.log_warning(namespace, warning);
                }
                self.logger.log_workload_waste(namespace, &estimate.record);

                audit.total_usd += estimate.record.total_cost_usd;
                audit.records.push(estimate.record);
                audit.warnings.extend(estimate.warnings);
                audit
            })
    }

    async fn audit_compute(&self, namespace: &str) -> Result<ComputeAudit, AuditError> {
        let workloads = self
            .source
            .list_workloads(namespace)
            .await
            .map_err(|e| AuditError::retrieval("workloads and usage metrics", e))?;

        Ok(self.estimate_all(namespace, &workloads))
    }

    async fn audit_storage(&self, namespace: &str) -> Result<Vec<OrphanRecord>, AuditError> {
        let (claims, bindings) = tokio::join!(
            self.source.list_storage_claims(namespace),
            self.source.list_active_claim_references(namespace)
        );
        let claims = claims.map_err(|e| AuditError::retrieval("storage claims", e))?;
        let bindings = bindings.map_err(|e| AuditError::retrieval("pod volume bindings", e));

        let orphans = self.detector.detect_with_bindings(&claims, bindings)?;
        for orphan in &orphans {
            self.logger.log_orphan_claim(namespace, orphan);
        }
        Ok(orphans)
    }

    fn settle<T>(
        &self,
        namespace: &str,
        sub_audit: SubAudit,
        result: Result<T, AuditError>,
        failures: &mut Vec<SubAuditFailure>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let error = e.to_string();
                self.logger.log_sub_audit_failed(namespace, sub_audit, &error);
                failures.push(SubAuditFailure { sub_audit, error });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::models::{ResourceAmounts, Severity, StorageClaim, UsageSample, WorkloadUnit};
    use crate::source::async_trait;
    use std::collections::HashSet;

    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    /// In-memory source with per-call failure switches
    #[derive(Default)]
    struct FakeSource {
        workloads: Vec<WorkloadWithUsage>,
        claims: Vec<StorageClaim>,
        fail_workloads: bool,
        fail_claims: bool,
        fail_bindings: bool,
    }

    fn down() -> SourceError {
        SourceError::Unavailable("connection refused".into())
    }

    #[async_trait]
    impl ClusterSource for FakeSource {
        async fn list_workloads(
            &self,
            _namespace: &str,
        ) -> Result<Vec<WorkloadWithUsage>, SourceError> {
            if self.fail_workloads {
                return Err(down());
            }
            Ok(self.workloads.clone())
        }

        async fn list_storage_claims(
            &self,
            _namespace: &str,
        ) -> Result<Vec<StorageClaim>, SourceError> {
            if self.fail_claims {
                return Err(down());
            }
            Ok(self.claims.clone())
        }

        async fn list_active_claim_references(
            &self,
            _namespace: &str,
        ) -> Result<HashSet<String>, SourceError> {
            if self.fail_bindings {
                return Err(down());
            }
            Ok(crate::estimator::active_claims(
                self.workloads.iter().map(|(w, _)| w),
            ))
        }
    }

    fn populated() -> FakeSource {
        FakeSource {
            workloads: vec![
                (
                    WorkloadUnit::new("api-1", ResourceAmounts::declared(0.0, 0.0)),
                    None,
                ),
                (
                    WorkloadUnit::new("api-2", ResourceAmounts::declared(500.0, GIB))
                        .with_claims(["pvc-a"]),
                    Some(UsageSample::new(
                        "api-2",
                        ResourceAmounts::declared(500.0, GIB),
                    )),
                ),
                (
                    WorkloadUnit::new("batch", ResourceAmounts::declared(4000.0, 8.0 * GIB)),
                    Some(UsageSample::new("batch", ResourceAmounts::declared(0.0, 0.0))),
                ),
            ],
            claims: vec![
                StorageClaim::new("pvc-a", Some("5Gi".into())),
                StorageClaim::new("pvc-b", Some("10Gi".into())),
            ],
            ..Default::default()
        }
    }

    fn orchestrator(source: FakeSource, config: AuditConfig) -> AuditOrchestrator {
        AuditOrchestrator::new(Arc::new(source), config)
    }

    #[tokio::test]
    async fn test_full_audit_report() {
        let report = orchestrator(populated(), AuditConfig::default())
            .run_audit("simulation")
            .await
            .unwrap();

        let names: Vec<_> = report.waste_records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["api-1", "api-2", "batch"]);
        assert_eq!(report.waste_records[0].severity, Severity::Waste);
        assert_eq!(report.waste_records[1].severity, Severity::Optimized);
        assert_eq!(report.waste_records[2].severity, Severity::HighWaste);

        let sum: f64 = report.waste_records.iter().map(|r| r.total_cost_usd).sum();
        assert_eq!(report.cluster_total_usd, sum);

        assert_eq!(report.orphan_records.len(), 1);
        assert_eq!(report.orphan_records[0].name, "pvc-b");
        assert_eq!(report.orphan_records[0].estimated_monthly_cost_usd, 0.20);

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].workload(), "api-1");
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_empty_namespace() {
        let report = orchestrator(FakeSource::default(), AuditConfig::default())
            .run_audit("empty")
            .await
            .unwrap();

        assert!(report.waste_records.is_empty());
        assert!(report.orphan_records.is_empty());
        assert_eq!(report.cluster_total_usd, 0.0);
        assert!(report.warnings.is_empty());
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_compute_failure_still_reports_storage() {
        let source = FakeSource {
            fail_workloads: true,
            ..populated()
        };
        let report = orchestrator(source, AuditConfig::default())
            .run_audit("simulation")
            .await
            .unwrap();

        assert!(report.waste_records.is_empty());
        assert_eq!(report.cluster_total_usd, 0.0);
        assert_eq!(report.orphan_records.len(), 1);
        assert!(report.failure(SubAudit::Compute).is_some());
        assert!(report.failure(SubAudit::Storage).is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_still_reports_compute() {
        let source = FakeSource {
            fail_claims: true,
            ..populated()
        };
        let report = orchestrator(source, AuditConfig::default())
            .run_audit("simulation")
            .await
            .unwrap();

        assert_eq!(report.waste_records.len(), 3);
        assert!(report.orphan_records.is_empty());
        assert!(report.failure(SubAudit::Storage).is_some());
        assert!(report.failure(SubAudit::Compute).is_none());
    }

    #[tokio::test]
    async fn test_missing_bindings_fail_storage_not_flag_everything() {
        let source = FakeSource {
            fail_bindings: true,
            ..populated()
        };
        let report = orchestrator(source, AuditConfig::default())
            .run_audit("simulation")
            .await
            .unwrap();

        assert!(report.orphan_records.is_empty());
        let failure = report.failure(SubAudit::Storage).unwrap();
        assert!(failure.error.contains("bindings unavailable"));
    }

    #[tokio::test]
    async fn test_missing_bindings_in_degraded_mode_flag_every_claim() {
        let source = FakeSource {
            fail_bindings: true,
            ..populated()
        };
        let config = AuditConfig {
            allow_degraded_storage: true,
            ..Default::default()
        };
        let report = orchestrator(source, config)
            .run_audit("simulation")
            .await
            .unwrap();

        assert_eq!(report.orphan_records.len(), 2);
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_both_sub_audits_failing_fails_the_run() {
        let source = FakeSource {
            fail_workloads: true,
            fail_claims: true,
            ..populated()
        };
        let err = orchestrator(source, AuditConfig::default())
            .run_audit("simulation")
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::AuditFailed { .. }));
        assert_eq!(err.sub_audit_errors().len(), 2);
    }

    #[tokio::test]
    async fn test_total_is_order_independent() {
        let orchestrator = orchestrator(FakeSource::default(), AuditConfig::default());
        let mut workloads = populated().workloads;
        let forward = orchestrator.estimate_all("ns", &workloads).total_usd;
        workloads.reverse();
        let reversed = orchestrator.estimate_all("ns", &workloads);

        assert!((forward - reversed.total_usd).abs() < 1e-9);
        assert_eq!(reversed.records[0].name, "batch");
    }

    #[tokio::test]
    async fn test_repeated_audits_are_identical() {
        let orchestrator = orchestrator(populated(), AuditConfig::default());
        let first = orchestrator.run_audit("simulation").await.unwrap();
        let second = orchestrator.run_audit("simulation").await.unwrap();

        assert_eq!(first.waste_records, second.waste_records);
        assert_eq!(first.orphan_records, second.orphan_records);
        assert_eq!(first.warnings, second.warnings);
    }
}
