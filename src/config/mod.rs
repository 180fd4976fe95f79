//! Configuration module for creditwatch.
//!
//! The service is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! path = "creditwatch.db"
//!
//! [cost_source]
//! base_url = "https://billing-export.internal/v1"
//! auth_token = "${COST_SOURCE_TOKEN}"
//! ```

mod batch;
mod billing;
mod compute;
mod cost_source;
mod database;
mod expiration;
mod notifications;
mod observability;

use std::path::Path;

pub use batch::*;
pub use billing::*;
pub use compute::*;
pub use cost_source::*;
pub use database::*;
pub use expiration::*;
pub use notifications::*;
pub use observability::*;
use serde::{Deserialize, Serialize};

/// Root configuration for the creditwatch service.
///
/// This struct represents the complete configuration file. All sections
/// are optional with sensible defaults, allowing minimal configuration
/// for simple deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database configuration for persistent storage.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Credit limits, alert thresholds, and staleness policy.
    #[serde(default)]
    pub billing: BillingConfig,

    /// Reconciliation batch sizing and scheduling.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Credit expiration lifecycle configuration.
    #[serde(default)]
    pub expiration: ExpirationConfig,

    /// Upstream cost source (cloud billing export) configuration.
    #[serde(default)]
    pub cost_source: CostSourceConfig,

    /// Compute control-plane configuration for runtime teardown.
    #[serde(default)]
    pub compute: ComputeConfig,

    /// Outbound notification configuration.
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;

        let config: AppConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.billing.validate()?;
        self.batch.validate()?;
        self.expiration.validate()?;
        self.cost_source.validate()?;
        self.compute.validate()?;
        self.notifications.validate()?;

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database: DatabaseConfig::default(),
            billing: BillingConfig::default(),
            batch: BatchConfig::default(),
            expiration: ExpirationConfig::default(),
            cost_source: CostSourceConfig::default(),
            compute: ComputeConfig::default(),
            notifications: NotificationsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR_NAME}` references with values from the environment.
///
/// Variables appearing after a `#` on a line are treated as comment text
/// and left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let match_start = cap.get(0).unwrap().start();

            // Skip if this variable is inside a comment
            if comment_pos.is_some_and(|pos| match_start >= pos) {
                continue;
            }

            line_result.push_str(&line[last_end..match_start]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = cap.get(0).unwrap().end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
