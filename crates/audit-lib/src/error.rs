//! Error types for the audit engine

use crate::models::SubAudit;
use thiserror::Error;

/// Failures that stop a sub-audit or a whole audit run
#[derive(Debug, Error)]
pub enum AuditError {
    /// A cluster query failed or timed out
    #[error("failed to retrieve {what}: {source}")]
    DataRetrieval {
        what: &'static str,
        #[source]
        source: SourceError,
    },

    /// Pod volume bindings could not be read and degraded mode is off
    #[error("pod volume bindings unavailable, refusing to flag claims as orphaned: {0}")]
    BindingsUnavailable(String),

    /// Neither sub-audit produced a result
    #[error("audit of namespace '{namespace}' failed: compute: {compute}; storage: {storage}")]
    AuditFailed {
        namespace: String,
        compute: Box<AuditError>,
        storage: Box<AuditError>,
    },
}

impl AuditError {
    pub fn retrieval(what: &'static str, source: SourceError) -> Self {
        AuditError::DataRetrieval { what, source }
    }

    /// Sub-audit errors carried by a failed run, in compute, storage order
    pub fn sub_audit_errors(&self) -> Vec<(SubAudit, &AuditError)> {
        match self {
            AuditError::AuditFailed {
                compute, storage, ..
            } => vec![(SubAudit::Compute, compute), (SubAudit::Storage, storage)],
            _ => Vec::new(),
        }
    }
}

/// Errors raised by a cluster data source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to infer kubernetes config: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("failed to read kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("metrics API not available: {0}")]
    MetricsUnavailable(String),

    #[error("{0}")]
    Unavailable(String),
}
