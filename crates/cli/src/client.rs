//! API client for a running kubegreen-server

use anyhow::{Context, Result};
use audit_lib::{AuditReport, SubAuditFailure};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Error body the server returns when no part of an audit could run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub failures: Vec<SubAuditFailure>,
}

/// Non-success responses from the server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{}", .0.error)]
    AuditFailed(ErrorResponse),

    #[error("API error ({status}): {body}")]
    Status { status: StatusCode, body: String },
}

/// API client for the audit service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status == StatusCode::BAD_GATEWAY {
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(error) => ApiError::AuditFailed(error).into(),
                Err(_) => ApiError::Status { status, body }.into(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    /// Ask the server to audit a namespace (its default when `None`)
    pub async fn trigger_audit(&self, namespace: Option<&str>) -> Result<AuditReport> {
        let query: Vec<(&str, &str)> = namespace.map(|ns| ("namespace", ns)).into_iter().collect();
        self.get("audit", &query).await
    }
}
