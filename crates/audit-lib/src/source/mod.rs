//! Cluster data sources feeding the audit
//!
//! A source hands the engine point-in-time snapshots of one namespace. The
//! live implementation talks to the Kubernetes API; the snapshot
//! implementation replays a saved JSON inventory.

mod live;
mod snapshot;

pub use live::KubeClusterSource;
pub use snapshot::{ClusterSnapshot, SnapshotSource, WorkloadEntry};

use crate::error::SourceError;
use crate::models::{StorageClaim, UsageSample, WorkloadUnit};
use std::collections::HashSet;

pub use async_trait::async_trait;

/// A workload paired with its usage sample, `None` when no metrics came back
pub type WorkloadWithUsage = (WorkloadUnit, Option<UsageSample>);

/// Supplier of workload, usage and storage inventories for a namespace
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Workloads in collaborator order, each paired with its usage sample
    async fn list_workloads(&self, namespace: &str) -> Result<Vec<WorkloadWithUsage>, SourceError>;

    /// Provisioned storage claims in inventory order
    async fn list_storage_claims(&self, namespace: &str) -> Result<Vec<StorageClaim>, SourceError>;

    /// Claim names mounted by live workloads
    async fn list_active_claim_references(
        &self,
        namespace: &str,
    ) -> Result<HashSet<String>, SourceError>;
}
