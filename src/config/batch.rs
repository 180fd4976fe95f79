use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Reconciliation batch sizing and scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Enable the periodic reconciliation worker.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How often the reconciliation worker runs, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Number of users per reconciliation batch. Values outside
    /// [min_batch_size, max_batch_size] are clamped at use time.
    #[serde(default = "default_user_batch_size")]
    pub user_batch_size: usize,

    /// Smallest allowed batch. Tiny batches defeat the point of
    /// batching the cost source queries.
    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,

    /// Largest allowed batch, bounding cost source query size.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Maximum number of batches processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "batch.interval_secs must be positive".into(),
            ));
        }
        if self.min_batch_size == 0 || self.min_batch_size > self.max_batch_size {
            return Err(ConfigError::Validation(
                "batch.min_batch_size must be positive and not exceed max_batch_size".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Validation(
                "batch.concurrency must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The configured batch size, clamped to the supported range.
    pub fn effective_user_batch_size(&self) -> usize {
        self.user_batch_size
            .clamp(self.min_batch_size, self.max_batch_size)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            user_batch_size: default_user_batch_size(),
            min_batch_size: default_min_batch_size(),
            max_batch_size: default_max_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    1800
}

fn default_user_batch_size() -> usize {
    100
}

fn default_min_batch_size() -> usize {
    5
}

fn default_max_batch_size() -> usize {
    999
}

fn default_concurrency() -> usize {
    1
}
