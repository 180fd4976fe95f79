use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Outbound notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    /// Webhook endpoint that receives alert and expiration notifications
    /// as JSON. When unset, notifications are logged and dropped.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl NotificationsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.webhook_url {
            url::Url::parse(url).map_err(|e| {
                ConfigError::Validation(format!(
                    "notifications.webhook_url is not a valid URL: {}",
                    e
                ))
            })?;
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "notifications.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        NotificationsConfig {
            webhook_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_webhook_url_rejected() {
        let config: NotificationsConfig = toml::from_str("webhook_url = \"::nope::\"").unwrap();
        assert!(config.validate().is_err());
    }
}
