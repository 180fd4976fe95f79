//! Cost source abstraction over the cloud billing export.
//!
//! Reconciliation fetches live per-project compute costs in one query
//! per batch. The HTTP implementation talks to a billing export API;
//! the fake implementation backs tests.

mod fake;
mod http;

use std::collections::HashMap;

use async_trait::async_trait;
pub use fake::StaticCostSource;
pub use http::HttpCostSource;

/// Errors from fetching live costs.
#[derive(Debug, thiserror::Error)]
pub enum CostSourceError {
    #[error("Cost source is not configured")]
    NotConfigured,

    #[error("Cost source request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cost source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode cost source response: {0}")]
    Decode(String),
}

/// Source of live per-project compute costs.
///
/// A single call covers every cloud project in a reconciliation batch.
/// Projects unknown to the source are simply absent from the result;
/// callers treat them as having no recorded spend.
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Fetch the total cost in USD accrued by each of the given cloud
    /// projects, keyed by project id.
    async fn fetch_costs(
        &self,
        cloud_projects: &[String],
    ) -> Result<HashMap<String, f64>, CostSourceError>;
}
