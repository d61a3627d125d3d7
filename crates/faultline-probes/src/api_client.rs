use crate::error::{ProbeError, Result};
use faultline_core::ChaosEngine;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const ENGINE_API_PATH: &str = "apis/litmuschaos.io/v1alpha1";

/// Lightweight HTTP client for reading ChaosEngine resources from the API server
pub struct EngineApiClient {
    base_url: String,
    client: Client,
}

impl EngineApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// GET /apis/litmuschaos.io/v1alpha1/namespaces/{namespace}/chaosengines/{name}
    pub async fn get_chaos_engine(&self, namespace: &str, name: &str) -> Result<ChaosEngine> {
        let url = format!(
            "{}/{}/namespaces/{}/chaosengines/{}",
            self.base_url, ENGINE_API_PATH, namespace, name
        );
        debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::fetch_failed(name, format!("HTTP request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProbeError::fetch_failed(
                name,
                format!("GET chaosengine failed with status {}: {}", status, body),
            ));
        }

        resp.json::<ChaosEngine>().await.map_err(|e| {
            ProbeError::fetch_failed(name, format!("Failed to parse chaosengine: {}", e))
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
