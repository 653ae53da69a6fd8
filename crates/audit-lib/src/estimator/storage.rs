//! Orphaned storage claim detection

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::models::{OrphanRecord, StorageClaim, WorkloadUnit};
use std::collections::HashSet;
use tracing::warn;

/// Claim names mounted by any of the given workloads
pub fn active_claims<'a, I>(workloads: I) -> HashSet<String>
where
    I: IntoIterator<Item = &'a WorkloadUnit>,
{
    workloads
        .into_iter()
        .flat_map(|w| w.claim_refs.iter().cloned())
        .collect()
}

/// Flags storage claims that no workload mounts
#[derive(Debug, Clone)]
pub struct OrphanDetector {
    monthly_cost: f64,
    allow_degraded: bool,
}

impl OrphanDetector {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            monthly_cost: config.orphan_claim_monthly_cost,
            allow_degraded: config.allow_degraded_storage,
        }
    }

    /// Every claim outside `active`, in inventory order, at the flat rate
    pub fn detect(&self, claims: &[StorageClaim], active: &HashSet<String>) -> Vec<OrphanRecord> {
        claims
            .iter()
            .filter(|claim| !active.contains(&claim.name))
            .map(|claim| OrphanRecord {
                name: claim.name.clone(),
                declared_size: claim.declared_size.clone(),
                estimated_monthly_cost_usd: self.monthly_cost,
            })
            .collect()
    }

    /// Orphans over the workloads' own mounts
    pub fn detect_for_workloads(
        &self,
        claims: &[StorageClaim],
        workloads: &[WorkloadUnit],
    ) -> Vec<OrphanRecord> {
        self.detect(claims, &active_claims(workloads))
    }

    /// Orphans when the binding lookup itself may have failed
    ///
    /// Without bindings every claim would look orphaned, so this fails unless
    /// degraded mode was explicitly enabled.
    pub fn detect_with_bindings(
        &self,
        claims: &[StorageClaim],
        bindings: Result<HashSet<String>, AuditError>,
    ) -> Result<Vec<OrphanRecord>, AuditError> {
        match bindings {
            Ok(active) => Ok(self.detect(claims, &active)),
            Err(e) if self.allow_degraded => {
                warn!(
                    error = %e,
                    claims = claims.len(),
                    "Pod volume bindings unavailable, flagging every claim in degraded mode"
                );
                Ok(self.detect(claims, &HashSet::new()))
            }
            Err(e) => Err(AuditError::BindingsUnavailable(e.to_string())),
        }
    }
}
