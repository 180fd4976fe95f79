use std::time::Duration;

use async_trait::async_trait;

use super::{ComputeClient, ComputeError};
use crate::config::ComputeConfig;

/// Compute client backed by the control-plane HTTP API.
pub struct HttpComputeClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpComputeClient {
    pub fn from_config(config: &ComputeConfig) -> Result<Self, ComputeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<(), ComputeError> {
        let request = match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ComputeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeClient for HttpComputeClient {
    async fn delete_runtimes(&self, cloud_project: &str) -> Result<(), ComputeError> {
        let url = format!("{}/projects/{}/runtimes", self.base_url, cloud_project);
        self.execute(self.client.delete(&url)).await
    }

    async fn unlink_billing_account(&self, cloud_project: &str) -> Result<(), ComputeError> {
        let url = format!("{}/projects/{}/billing", self.base_url, cloud_project);
        self.execute(self.client.delete(&url)).await
    }
}
