//! Waste audit library for Kubernetes namespaces
//!
//! This crate provides the core functionality for:
//! - Compute waste estimation (requests versus measured usage)
//! - Orphaned storage claim detection
//! - Audit orchestration with isolated compute and storage failures
//! - Kubernetes and snapshot data sources
//! - Health checks and observability

pub mod audit;
pub mod config;
pub mod error;
pub mod estimator;
pub mod health;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod render;
pub mod source;

pub use audit::{AuditOrchestrator, ComputeAudit};
pub use config::AuditConfig;
pub use error::{AuditError, SourceError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AuditMetrics, StructuredLogger};
pub use render::{render_text, RenderOptions};
pub use source::{ClusterSource, KubeClusterSource, SnapshotSource};
