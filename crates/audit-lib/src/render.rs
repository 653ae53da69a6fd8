//! Plain-text audit report, as written to logs and `GET /audit?format=text`

use crate::config::AuditConfig;
use crate::models::{AuditReport, Severity, SubAudit};

const RULE: &str = "================================================";

/// Options controlling which compute records are listed
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// List every record, not only the significant ones
    pub show_all: bool,
}

/// Human-facing label for a severity tier
pub fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Optimized => "OPTIMIZED",
        Severity::Waste => "WASTE",
        Severity::HighWaste => "HIGH WASTE",
    }
}

/// Render a report as a console-style text block
pub fn render_text(report: &AuditReport, config: &AuditConfig, options: RenderOptions) -> String {
    let mut out = format!("GREEN KUBE AUDIT REPORT ({})\n{}\n", report.namespace, RULE);

    out.push_str("--- COMPUTE AUDIT (CPU + RAM) ---\n");
    match report.failure(SubAudit::Compute) {
        Some(failure) => out.push_str(&format!("Compute audit failed: {}\n", failure.error)),
        None => {
            for record in report
                .waste_records
                .iter()
                .filter(|r| options.show_all || config.is_significant(r))
            {
                out.push_str(&format!(
                    "Pod: {:<18} | CPU Waste: ${:.2} | RAM Waste: ${:.2} | Total: ${:.2}/mo | {}\n",
                    record.name,
                    record.cpu_cost_usd,
                    record.ram_cost_usd,
                    record.total_cost_usd,
                    severity_label(record.severity)
                ));
            }
            out.push_str(&format!(
                "\nTOTAL POTENTIAL SAVINGS: ${:.2} / Month\n",
                report.cluster_total_usd
            ));
        }
    }

    out.push_str("\n--- STORAGE (PVCs) ---\n");
    match report.failure(SubAudit::Storage) {
        Some(failure) => out.push_str(&format!("Storage audit failed: {}\n", failure.error)),
        None if report.orphan_records.is_empty() => out.push_str("No storage waste found.\n"),
        None => {
            for orphan in &report.orphan_records {
                out.push_str(&format!(
                    "ORPHAN FOUND: PVC '{}' ({}) is unused! Cost: ~${:.2}/mo\n",
                    orphan.name,
                    orphan.declared_size.as_deref().unwrap_or("unknown size"),
                    orphan.estimated_monthly_cost_usd
                ));
            }
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("\n--- WARNINGS ---\n");
        for warning in &report.warnings {
            out.push_str(&format!("Warning: {}\n", warning));
        }
    }

    out.push_str(RULE);
    out.push('\n');
    out
}
