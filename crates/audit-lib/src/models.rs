//! Core data models for the waste audit
//!
//! Everything here is a point-in-time snapshot built fresh for each audit run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single resource value as reported by the cluster
///
/// Keeps "not declared" and "declared but unreadable" apart from a real zero,
/// even though all three contribute nothing to a cost.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ResourceField {
    /// The key was not present
    #[default]
    Unspecified,
    /// A parsed value (millicores for CPU, bytes for memory)
    Declared(f64),
    /// The key was present but its quantity could not be parsed
    Malformed(String),
}

impl ResourceField {
    /// Numeric value, degrading anything that is not a valid declaration to 0
    pub fn value_or_zero(&self) -> f64 {
        match self {
            ResourceField::Declared(v) if v.is_finite() && *v > 0.0 => *v,
            _ => 0.0,
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.unreadable_raw().is_some()
    }

    /// Raw text of a value present but unusable: unparseable, or a declared
    /// number that is negative or not finite
    pub fn unreadable_raw(&self) -> Option<String> {
        match self {
            ResourceField::Malformed(raw) => Some(raw.clone()),
            ResourceField::Declared(v) if !v.is_finite() || *v < 0.0 => Some(v.to_string()),
            _ => None,
        }
    }
}

/// Resource kinds considered for accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cpu => write!(f, "cpu"),
            ResourceKind::Memory => write!(f, "memory"),
        }
    }
}

/// CPU and memory amounts for the primary container
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceAmounts {
    #[serde(default)]
    pub cpu_millicores: ResourceField,
    #[serde(default)]
    pub memory_bytes: ResourceField,
}

impl ResourceAmounts {
    pub fn new(cpu_millicores: ResourceField, memory_bytes: ResourceField) -> Self {
        Self {
            cpu_millicores,
            memory_bytes,
        }
    }

    /// Both values declared
    pub fn declared(cpu_millicores: f64, memory_bytes: f64) -> Self {
        Self::new(
            ResourceField::Declared(cpu_millicores),
            ResourceField::Declared(memory_bytes),
        )
    }

    pub fn field(&self, kind: ResourceKind) -> &ResourceField {
        match kind {
            ResourceKind::Cpu => &self.cpu_millicores,
            ResourceKind::Memory => &self.memory_bytes,
        }
    }
}

/// A schedulable unit (pod) with one primary container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadUnit {
    pub name: String,
    #[serde(default)]
    pub requests: ResourceAmounts,
    /// Names of the storage claims this workload mounts
    #[serde(default)]
    pub claim_refs: Vec<String>,
}

impl WorkloadUnit {
    pub fn new(name: impl Into<String>, requests: ResourceAmounts) -> Self {
        Self {
            name: name.into(),
            requests,
            claim_refs: Vec::new(),
        }
    }

    pub fn with_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.claim_refs = claims.into_iter().map(Into::into).collect();
        self
    }
}

/// Measured usage for a workload's primary container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub name: String,
    /// `None` when the sample carries no container usage entry
    pub usage: Option<ResourceAmounts>,
}

impl UsageSample {
    pub fn new(name: impl Into<String>, usage: ResourceAmounts) -> Self {
        Self {
            name: name.into(),
            usage: Some(usage),
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: None,
        }
    }
}

/// A provisioned persistent volume claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClaim {
    pub name: String,
    /// Declared capacity as written in the claim, e.g. `10Gi`
    pub declared_size: Option<String>,
}

impl StorageClaim {
    pub fn new(name: impl Into<String>, declared_size: Option<String>) -> Self {
        Self {
            name: name.into(),
            declared_size,
        }
    }
}

/// Waste severity tier for a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Optimized,
    Waste,
    HighWaste,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Optimized => write!(f, "OPTIMIZED"),
            Severity::Waste => write!(f, "WASTE"),
            Severity::HighWaste => write!(f, "HIGH_WASTE"),
        }
    }
}

/// Estimated monthly waste for one workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasteRecord {
    pub name: String,
    pub cpu_cost_usd: f64,
    pub ram_cost_usd: f64,
    pub total_cost_usd: f64,
    pub severity: Severity,
    /// CPU request after the default floor was applied
    pub effective_cpu_request_millicores: f64,
    pub ram_request_bytes: f64,
}

/// A claim that no workload references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanRecord {
    pub name: String,
    pub declared_size: Option<String>,
    pub estimated_monthly_cost_usd: f64,
}

/// Non-fatal findings raised while estimating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditWarning {
    /// No request declared for the resource; a default was assumed
    MissingRequest {
        workload: String,
        resource: ResourceKind,
    },
    /// A present quantity could not be parsed and was treated as 0
    MalformedField {
        workload: String,
        resource: ResourceKind,
        field: FieldOrigin,
        raw: String,
    },
}

impl AuditWarning {
    pub fn workload(&self) -> &str {
        match self {
            AuditWarning::MissingRequest { workload, .. }
            | AuditWarning::MalformedField { workload, .. } => workload,
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuditWarning::MissingRequest { .. } => "missing_request",
            AuditWarning::MalformedField { .. } => "malformed_field",
        }
    }
}

impl fmt::Display for AuditWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditWarning::MissingRequest { workload, resource } => {
                write!(f, "Pod {} has no {} request set", workload, resource)
            }
            AuditWarning::MalformedField {
                workload,
                resource,
                field,
                raw,
            } => write!(
                f,
                "Pod {} has an unreadable {} {} '{}', treated as 0",
                workload, resource, field, raw
            ),
        }
    }
}

/// Which side of the comparison a field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOrigin {
    Request,
    Usage,
}

impl fmt::Display for FieldOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldOrigin::Request => write!(f, "request"),
            FieldOrigin::Usage => write!(f, "usage"),
        }
    }
}

/// The two independent halves of an audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubAudit {
    Compute,
    Storage,
}

impl fmt::Display for SubAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubAudit::Compute => write!(f, "compute"),
            SubAudit::Storage => write!(f, "storage"),
        }
    }
}

/// A sub-audit that could not complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAuditFailure {
    pub sub_audit: SubAudit,
    pub error: String,
}

/// Result of one audit run over a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub namespace: String,
    pub generated_at: DateTime<Utc>,
    /// One record per workload, in the order the cluster returned them
    pub waste_records: Vec<WasteRecord>,
    pub orphan_records: Vec<OrphanRecord>,
    pub cluster_total_usd: f64,
    pub warnings: Vec<AuditWarning>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SubAuditFailure>,
}

impl AuditReport {
    /// Total estimated monthly cost of orphaned claims
    pub fn orphan_total_usd(&self) -> f64 {
        self.orphan_records
            .iter()
            .map(|o| o.estimated_monthly_cost_usd)
            .sum()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failure(&self, sub_audit: SubAudit) -> Option<&SubAuditFailure> {
        self.failures.iter().find(|f| f.sub_audit == sub_audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_field_degrades_to_zero() {
        assert_eq!(ResourceField::Unspecified.value_or_zero(), 0.0);
        assert_eq!(ResourceField::Malformed("abc".into()).value_or_zero(), 0.0);
        assert_eq!(ResourceField::Declared(-5.0).value_or_zero(), 0.0);
        assert_eq!(ResourceField::Declared(f64::NAN).value_or_zero(), 0.0);
        assert_eq!(ResourceField::Declared(250.0).value_or_zero(), 250.0);
    }

    #[test]
    fn test_severity_serializes_as_tier_name() {
        let json = serde_json::to_string(&Severity::HighWaste).unwrap();
        assert_eq!(json, "\"HIGH_WASTE\"");
        assert_eq!(Severity::Waste.to_string(), "WASTE");
    }

    #[test]
    fn test_warning_display_names_workload() {
        let warning = AuditWarning::MissingRequest {
            workload: "api-1".into(),
            resource: ResourceKind::Cpu,
        };
        assert_eq!(warning.workload(), "api-1");
        assert_eq!(warning.kind(), "missing_request");
        assert!(warning.to_string().contains("api-1"));
    }
}
