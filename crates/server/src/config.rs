//! Service configuration

use anyhow::{Context, Result};
use audit_lib::AuditConfig;
use serde::Deserialize;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// API server port for the audit trigger and health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Namespace audited when a request does not name one
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Path to a kubeconfig; in-cluster or default config when unset
    #[serde(default)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use
    #[serde(default)]
    pub context: Option<String>,

    /// Pricing and classification settings
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_api_port() -> u16 {
    8080
}

fn default_namespace() -> String {
    "simulation".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            namespace: default_namespace(),
            kubeconfig: None,
            context: None,
            audit: AuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `kubegreen` file and the
    /// environment (`KUBEGREEN_API_PORT`, `KUBEGREEN_AUDIT__HOURS_PER_MONTH`, ...)
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("kubegreen").required(false))
            .add_source(Self::environment())
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// `KUBEGREEN_*` variables, `__` separating nested keys
    fn environment() -> config::Environment {
        config::Environment::with_prefix("KUBEGREEN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.namespace, "simulation");
        assert!(config.kubeconfig.is_none());
        assert_eq!(config.audit, AuditConfig::default());
    }

    #[test]
    fn test_nested_audit_settings_from_source() {
        let config: ServerConfig = config::Config::builder()
            .set_override("namespace", "payments")
            .unwrap()
            .set_override("audit.allow_degraded_storage", true)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.namespace, "payments");
        assert_eq!(config.api_port, 8080);
        assert!(config.audit.allow_degraded_storage);
        assert_eq!(config.audit.cpu_cost_per_core_hour, 0.0315);
    }

    #[test]
    fn test_environment_variables_map_to_nested_keys() {
        let vars: config::Map<String, String> = [
            ("KUBEGREEN_API_PORT", "9090"),
            ("KUBEGREEN_NAMESPACE", "payments"),
            ("KUBEGREEN_AUDIT__HOURS_PER_MONTH", "720"),
            ("KUBEGREEN_AUDIT__ALLOW_DEGRADED_STORAGE", "true"),
            ("OTHER_API_PORT", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config: ServerConfig = config::Config::builder()
            .add_source(ServerConfig::environment().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.api_port, 9090);
        assert_eq!(config.namespace, "payments");
        assert_eq!(config.audit.hours_per_month, 720.0);
        assert!(config.audit.allow_degraded_storage);
        assert_eq!(config.audit.orphan_claim_monthly_cost, 0.20);
    }
}
