//! Pricing and classification settings for the audit engine

use crate::models::{Severity, WasteRecord};
use serde::{Deserialize, Serialize};

/// Audit configuration
///
/// Prices are fixed constants; every field has a default so a partial
/// configuration source is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Price of one full core for one hour (USD)
    #[serde(default = "default_cpu_cost_per_core_hour")]
    pub cpu_cost_per_core_hour: f64,

    /// Price of one GiB of memory for one hour (USD)
    #[serde(default = "default_ram_cost_per_gib_hour")]
    pub ram_cost_per_gib_hour: f64,

    /// Hours billed per month
    #[serde(default = "default_hours_per_month")]
    pub hours_per_month: f64,

    /// Flat monthly cost assigned to each orphaned claim (USD)
    #[serde(default = "default_orphan_claim_monthly_cost")]
    pub orphan_claim_monthly_cost: f64,

    /// CPU request assumed when a workload declares none
    #[serde(default = "default_cpu_request_millicores")]
    pub default_cpu_request_millicores: f64,

    /// Monthly waste above which a workload is classified WASTE
    #[serde(default = "default_waste_threshold")]
    pub waste_threshold_usd: f64,

    /// Monthly waste above which a workload is classified HIGH_WASTE
    #[serde(default = "default_high_waste_threshold")]
    pub high_waste_threshold_usd: f64,

    /// Monthly waste above which a record is always worth listing
    #[serde(default = "default_significance_threshold")]
    pub significance_cost_threshold_usd: f64,

    /// Flag every claim as orphaned when pod volume bindings cannot be read,
    /// instead of failing the storage audit
    #[serde(default)]
    pub allow_degraded_storage: bool,
}

fn default_cpu_cost_per_core_hour() -> f64 {
    0.0315
}

fn default_ram_cost_per_gib_hour() -> f64 {
    0.004
}

fn default_hours_per_month() -> f64 {
    730.0
}

fn default_orphan_claim_monthly_cost() -> f64 {
    0.20
}

fn default_cpu_request_millicores() -> f64 {
    100.0
}

fn default_waste_threshold() -> f64 {
    1.0
}

fn default_high_waste_threshold() -> f64 {
    5.0
}

fn default_significance_threshold() -> f64 {
    0.1
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            cpu_cost_per_core_hour: default_cpu_cost_per_core_hour(),
            ram_cost_per_gib_hour: default_ram_cost_per_gib_hour(),
            hours_per_month: default_hours_per_month(),
            orphan_claim_monthly_cost: default_orphan_claim_monthly_cost(),
            default_cpu_request_millicores: default_cpu_request_millicores(),
            waste_threshold_usd: default_waste_threshold(),
            high_waste_threshold_usd: default_high_waste_threshold(),
            significance_cost_threshold_usd: default_significance_threshold(),
            allow_degraded_storage: false,
        }
    }
}

impl AuditConfig {
    /// Classify a monthly waste amount; thresholds are strict, so a value
    /// equal to a cutoff stays in the lower tier
    pub fn classify(&self, total_cost_usd: f64) -> Severity {
        if total_cost_usd > self.high_waste_threshold_usd {
            Severity::HighWaste
        } else if total_cost_usd > self.waste_threshold_usd {
            Severity::Waste
        } else {
            Severity::Optimized
        }
    }

    /// Whether a record deserves a line in a human-facing listing
    pub fn is_significant(&self, record: &WasteRecord) -> bool {
        record.total_cost_usd > self.significance_cost_threshold_usd
            || record.effective_cpu_request_millicores > 0.0
            || record.ram_request_bytes > 0.0
    }
}
