//! Compute control-plane client.
//!
//! When credits expire, every runtime in the user's workspaces is torn
//! down so no further spend accrues. Teardown goes through the compute
//! control plane; deployments without one fall back to a no-op client
//! and rely on billing access flags alone.

mod http;
mod recording;

use std::sync::Arc;

use async_trait::async_trait;
pub use http::HttpComputeClient;
pub use recording::RecordingComputeClient;

use crate::config::ComputeConfig;

/// Errors from compute control-plane operations.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Compute request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Compute control plane returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Operations against the compute control plane, keyed by cloud project.
#[async_trait]
pub trait ComputeClient: Send + Sync {
    /// Delete all runtimes in the given cloud project.
    async fn delete_runtimes(&self, cloud_project: &str) -> Result<(), ComputeError>;

    /// Detach the billing account from the given cloud project.
    async fn unlink_billing_account(&self, cloud_project: &str) -> Result<(), ComputeError>;
}

/// Build the configured client. Falls back to a no-op when no control
/// plane is configured.
pub fn from_config(config: &ComputeConfig) -> Result<Arc<dyn ComputeClient>, ComputeError> {
    match &config.base_url {
        Some(_) => Ok(Arc::new(HttpComputeClient::from_config(config)?)),
        None => Ok(Arc::new(NoopComputeClient)),
    }
}

/// Logs and skips compute operations.
pub struct NoopComputeClient;

#[async_trait]
impl ComputeClient for NoopComputeClient {
    async fn delete_runtimes(&self, cloud_project: &str) -> Result<(), ComputeError> {
        tracing::info!(cloud_project, "No compute control plane configured, skipping runtime teardown");
        Ok(())
    }

    async fn unlink_billing_account(&self, cloud_project: &str) -> Result<(), ComputeError> {
        tracing::info!(cloud_project, "No compute control plane configured, skipping billing unlink");
        Ok(())
    }
}
