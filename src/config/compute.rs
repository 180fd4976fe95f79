use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Compute control-plane configuration, used to tear down workspace
/// runtimes and unlink billing when credits run out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeConfig {
    /// Base URL of the compute control-plane API. When unset, runtime
    /// teardown is skipped and only billing access flags are updated.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token sent with each request.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ComputeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.base_url {
            url::Url::parse(url).map_err(|e| {
                ConfigError::Validation(format!("compute.base_url is not a valid URL: {}", e))
            })?;
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "compute.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        ComputeConfig {
            base_url: None,
            auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}
