use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Credit expiration lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpirationConfig {
    /// Enable the periodic expiration worker.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often the expiration worker runs, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Days of credit validity from the credit start time.
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,

    /// Total days of validity after a one-time extension, measured from
    /// the original credit start time.
    #[serde(default = "default_extension_period_days")]
    pub extension_period_days: i64,

    /// Days before expiration at which the warning notification is sent.
    #[serde(default = "default_warning_days")]
    pub warning_days: i64,

    /// Also unlink the billing account from each workspace when credits
    /// expire, instead of only disabling billing access.
    #[serde(default)]
    pub unlink_billing_account: bool,
}

impl ExpirationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "expiration.interval_secs must be positive".into(),
            ));
        }
        if self.validity_days <= 0 {
            return Err(ConfigError::Validation(
                "expiration.validity_days must be positive".into(),
            ));
        }
        if self.extension_period_days < self.validity_days {
            return Err(ConfigError::Validation(
                "expiration.extension_period_days must not be shorter than validity_days".into(),
            ));
        }
        if self.warning_days < 0 {
            return Err(ConfigError::Validation(
                "expiration.warning_days must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        ExpirationConfig {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            validity_days: default_validity_days(),
            extension_period_days: default_extension_period_days(),
            warning_days: default_warning_days(),
            unlink_billing_account: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_validity_days() -> i64 {
    365
}

fn default_extension_period_days() -> i64 {
    730
}

fn default_warning_days() -> i64 {
    14
}
