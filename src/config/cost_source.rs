use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upstream cost source (cloud billing export) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CostSourceConfig {
    /// Base URL of the billing export API. When unset, reconciliation
    /// cannot fetch live costs and the worker refuses to start.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token sent with each request.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CostSourceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.base_url {
            url::Url::parse(url).map_err(|e| {
                ConfigError::Validation(format!("cost_source.base_url is not a valid URL: {}", e))
            })?;
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "cost_source.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CostSourceConfig {
    fn default() -> Self {
        CostSourceConfig {
            base_url: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}
