//! Compute waste estimation
//!
//! Compares the primary container's requests against measured usage and
//! prices the unused share at fixed hourly rates.

use crate::config::AuditConfig;
use crate::models::{
    AuditWarning, FieldOrigin, ResourceAmounts, ResourceKind, UsageSample, WasteRecord,
    WorkloadUnit,
};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;
const MILLICORES_PER_CORE: f64 = 1000.0;

/// Waste record for one workload plus the warnings raised computing it
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeEstimate {
    pub record: WasteRecord,
    pub warnings: Vec<AuditWarning>,
}

/// Estimates monthly compute waste per workload
///
/// Pure: the same workload and sample always give the same estimate.
#[derive(Debug, Clone)]
pub struct ComputeEstimator {
    config: AuditConfig,
}

impl ComputeEstimator {
    pub fn new(config: AuditConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Estimate waste for a workload and its usage sample, if one was returned
    pub fn estimate(&self, unit: &WorkloadUnit, sample: Option<&UsageSample>) -> ComputeEstimate {
        let mut warnings = Vec::new();
        let usage = sample.and_then(|s| s.usage.as_ref());

        let declared_cpu = read_field(
            &unit.name,
            &unit.requests,
            ResourceKind::Cpu,
            FieldOrigin::Request,
            &mut warnings,
        );
        let cpu_request = if declared_cpu == 0.0 {
            warnings.push(AuditWarning::MissingRequest {
                workload: unit.name.clone(),
                resource: ResourceKind::Cpu,
            });
            self.config.default_cpu_request_millicores
        } else {
            declared_cpu
        };
        let cpu_used = read_usage(&unit.name, usage, ResourceKind::Cpu, &mut warnings);
        let cpu_cost = self.cpu_cost(cpu_request - cpu_used);

        let ram_request = read_field(
            &unit.name,
            &unit.requests,
            ResourceKind::Memory,
            FieldOrigin::Request,
            &mut warnings,
        );
        let ram_used = read_usage(&unit.name, usage, ResourceKind::Memory, &mut warnings);
        let ram_cost = self.ram_cost(ram_request - ram_used);

        let total = cpu_cost + ram_cost;

        ComputeEstimate {
            record: WasteRecord {
                name: unit.name.clone(),
                cpu_cost_usd: cpu_cost,
                ram_cost_usd: ram_cost,
                total_cost_usd: total,
                severity: self.config.classify(total),
                effective_cpu_request_millicores: cpu_request,
                ram_request_bytes: ram_request,
            },
            warnings,
        }
    }

    /// Monthly cost of idle millicores; non-positive waste costs nothing
    pub fn cpu_cost(&self, waste_millicores: f64) -> f64 {
        if waste_millicores <= 0.0 {
            return 0.0;
        }
        (waste_millicores / MILLICORES_PER_CORE)
            * self.config.cpu_cost_per_core_hour
            * self.config.hours_per_month
    }

    /// Monthly cost of idle memory bytes; non-positive waste costs nothing
    pub fn ram_cost(&self, waste_bytes: f64) -> f64 {
        if waste_bytes <= 0.0 {
            return 0.0;
        }
        (waste_bytes / BYTES_PER_GIB) * self.config.ram_cost_per_gib_hour * self.config.hours_per_month
    }
}

fn read_field(
    workload: &str,
    amounts: &ResourceAmounts,
    resource: ResourceKind,
    field: FieldOrigin,
    warnings: &mut Vec<AuditWarning>,
) -> f64 {
    let value = amounts.field(resource);
    if let Some(raw) = value.unreadable_raw() {
        warnings.push(AuditWarning::MalformedField {
            workload: workload.to_string(),
            resource,
            field,
            raw,
        });
    }
    value.value_or_zero()
}

fn read_usage(
    workload: &str,
    usage: Option<&ResourceAmounts>,
    resource: ResourceKind,
    warnings: &mut Vec<AuditWarning>,
) -> f64 {
    match usage {
        Some(amounts) => read_field(workload, amounts, resource, FieldOrigin::Usage, warnings),
        None => 0.0,
    }
}
