//! Offline source backed by a saved cluster inventory

use super::{async_trait, ClusterSource, WorkloadWithUsage};
use crate::error::SourceError;
use crate::estimator::active_claims;
use crate::models::{StorageClaim, UsageSample, WorkloadUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A workload and the usage sample recorded for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadEntry {
    pub workload: WorkloadUnit,
    #[serde(default)]
    pub usage: Option<UsageSample>,
}

/// Inventory of one namespace at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub workloads: Vec<WorkloadEntry>,
    #[serde(default)]
    pub claims: Vec<StorageClaim>,
    /// Mounted claim names; derived from the workloads when absent
    #[serde(default)]
    pub active_claim_refs: Option<Vec<String>>,
}

/// Replays a [`ClusterSnapshot`] regardless of the namespace asked for
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    snapshot: ClusterSnapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SourceError::Unavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        let snapshot = serde_json::from_str(&content).map_err(|e| {
            SourceError::Unavailable(format!("failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl ClusterSource for SnapshotSource {
    async fn list_workloads(&self, _namespace: &str) -> Result<Vec<WorkloadWithUsage>, SourceError> {
        Ok(self
            .snapshot
            .workloads
            .iter()
            .map(|entry| (entry.workload.clone(), entry.usage.clone()))
            .collect())
    }

    async fn list_storage_claims(&self, _namespace: &str) -> Result<Vec<StorageClaim>, SourceError> {
        Ok(self.snapshot.claims.clone())
    }

    async fn list_active_claim_references(
        &self,
        _namespace: &str,
    ) -> Result<HashSet<String>, SourceError> {
        Ok(match &self.snapshot.active_claim_refs {
            Some(refs) => refs.iter().cloned().collect(),
            None => active_claims(self.snapshot.workloads.iter().map(|e| &e.workload)),
        })
    }
}
