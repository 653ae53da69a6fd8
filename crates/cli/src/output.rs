//! Output formatting utilities

use audit_lib::{
    render::severity_label, AuditConfig, AuditReport, OrphanRecord, Severity, SubAudit,
    WasteRecord,
};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for the compute waste table
#[derive(Tabled)]
pub struct WasteRow {
    #[tabled(rename = "Pod")]
    pub pod: String,
    #[tabled(rename = "CPU Waste")]
    pub cpu: String,
    #[tabled(rename = "RAM Waste")]
    pub ram: String,
    #[tabled(rename = "Total/mo")]
    pub total: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&WasteRecord> for WasteRow {
    fn from(record: &WasteRecord) -> Self {
        Self {
            pod: record.name.clone(),
            cpu: format_currency(record.cpu_cost_usd),
            ram: format_currency(record.ram_cost_usd),
            total: format_currency(record.total_cost_usd),
            status: color_severity(record.severity),
        }
    }
}

/// Row for the orphaned storage table
#[derive(Tabled)]
pub struct OrphanRow {
    #[tabled(rename = "PVC")]
    pub name: String,
    #[tabled(rename = "Size")]
    pub size: String,
    #[tabled(rename = "Cost/mo")]
    pub cost: String,
}

impl From<&OrphanRecord> for OrphanRow {
    fn from(orphan: &OrphanRecord) -> Self {
        Self {
            name: orphan.name.clone(),
            size: orphan
                .declared_size
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            cost: format!("~{}", format_currency(orphan.estimated_monthly_cost_usd)),
        }
    }
}

/// Rows for the records worth showing
pub fn waste_rows(report: &AuditReport, config: &AuditConfig, show_all: bool) -> Vec<WasteRow> {
    report
        .waste_records
        .iter()
        .filter(|record| show_all || config.is_significant(record))
        .map(WasteRow::from)
        .collect()
}

/// Print an audit report
pub fn print_report(
    report: &AuditReport,
    config: &AuditConfig,
    show_all: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Table => print_report_table(report, config, show_all),
    }
    Ok(())
}

fn print_report_table(report: &AuditReport, config: &AuditConfig, show_all: bool) {
    println!(
        "{} {}",
        "KubeGreen Audit:".bold(),
        report.namespace.cyan()
    );
    println!("{}", format_timestamp(&report.generated_at).dimmed());
    println!();

    println!("{}", "Compute (CPU + RAM)".bold());
    match report.failure(SubAudit::Compute) {
        Some(failure) => print_error(&format!("Compute audit failed: {}", failure.error)),
        None => {
            let rows = waste_rows(report, config, show_all);
            if rows.is_empty() {
                print_info("No workloads to report");
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
            println!(
                "{} {} / month",
                "Total potential savings:".bold(),
                format_currency(report.cluster_total_usd).green().bold()
            );
        }
    }
    println!();

    println!("{}", "Storage (PVCs)".bold());
    match report.failure(SubAudit::Storage) {
        Some(failure) => print_error(&format!("Storage audit failed: {}", failure.error)),
        None if report.orphan_records.is_empty() => print_success("No storage waste found."),
        None => {
            let rows: Vec<OrphanRow> = report.orphan_records.iter().map(OrphanRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!(
                "{} {} / month",
                "Orphaned storage:".bold(),
                format_currency(report.orphan_total_usd()).yellow().bold()
            );
        }
    }

    if !report.warnings.is_empty() {
        println!();
        for warning in &report.warnings {
            print_warning(&warning.to_string());
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a monthly USD amount
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Color a severity tier
pub fn color_severity(severity: Severity) -> String {
    let label = severity_label(severity);
    match severity {
        Severity::HighWaste => label.red().bold().to_string(),
        Severity::Waste => label.yellow().to_string(),
        Severity::Optimized => label.green().to_string(),
    }
}

/// Format a report timestamp
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(name: &str, total: f64) -> WasteRecord {
        WasteRecord {
            name: name.into(),
            cpu_cost_usd: total,
            ram_cost_usd: 0.0,
            total_cost_usd: total,
            severity: AuditConfig::default().classify(total),
            effective_cpu_request_millicores: 0.0,
            ram_request_bytes: 0.0,
        }
    }

    fn report() -> AuditReport {
        AuditReport {
            namespace: "simulation".into(),
            generated_at: Utc::now(),
            waste_records: vec![record("api-1", 6.5), record("idle", 0.05)],
            orphan_records: Vec::new(),
            cluster_total_usd: 6.55,
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(2.2995), "$2.30");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(1234.5), "$1234.50");
    }

    #[test]
    fn test_waste_rows_hide_insignificant_records() {
        let config = AuditConfig::default();

        let rows = waste_rows(&report(), &config, false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pod, "api-1");
        assert_eq!(rows[0].total, "$6.50");
        assert!(rows[0].status.contains("HIGH WASTE"));

        assert_eq!(waste_rows(&report(), &config, true).len(), 2);
    }

    #[test]
    fn test_orphan_row_without_size() {
        let row = OrphanRow::from(&OrphanRecord {
            name: "pvc-b".into(),
            declared_size: None,
            estimated_monthly_cost_usd: 0.20,
        });
        assert_eq!(row.size, "unknown");
        assert_eq!(row.cost, "~$0.20");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01 12:30:00 UTC");
    }
}
