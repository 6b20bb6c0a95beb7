//! HTTP client for the Klipp extraction endpoint.

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::types::{ExtractionEnvelope, ExtractionRequest};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Anything that can turn an extraction request into the backend's response envelope.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionEnvelope>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    config: ScanConfig,
}

impl ApiClient {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ScanConfig::from_env()?)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}

#[async_trait]
impl ExtractionBackend for ApiClient {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionEnvelope> {
        let url = self.config.scan_url();
        let mut builder = self.client.post(&url).json(request);
        if let Some(token) = &self.config.api_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ScanError::Api {
                status: status.as_u16(),
                body,
            });
        }
        debug!(url = %url, bytes = body.len(), "[api] extraction response received");
        Ok(serde_json::from_str(&body)?)
    }
}
