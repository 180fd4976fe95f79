use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Credit limits, alert thresholds, and cost cache staleness policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BillingConfig {
    /// Default credit limit in USD for users without an override.
    #[serde(default = "default_credit_limit")]
    pub default_credit_limit: f64,

    /// Fractions of the credit limit at which usage alerts are sent.
    /// Each value must be strictly between 0 and 1.
    #[serde(default = "default_alert_thresholds")]
    pub alert_thresholds: Vec<f64>,

    /// Minimum age in minutes before a cached workspace cost is
    /// considered stale and re-fetched from the cost source.
    #[serde(default = "default_min_recheck_minutes")]
    pub min_recheck_minutes: i64,

    /// How many months back deleted workspaces remain eligible for
    /// cost reconciliation.
    #[serde(default = "default_deletion_lookback_months")]
    pub deletion_lookback_months: i64,

    /// Grace period in days after workspace deletion during which the
    /// cached cost is always refreshed, regardless of staleness.
    #[serde(default = "default_deletion_grace_days")]
    pub deletion_grace_days: i64,

    /// Billing accounts that represent subsidized credits. Workspaces on
    /// any other account are user-funded and never deactivated by this
    /// service.
    #[serde(default)]
    pub credit_billing_accounts: Vec<String>,
}

impl BillingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_credit_limit <= 0.0 {
            return Err(ConfigError::Validation(
                "billing.default_credit_limit must be positive".into(),
            ));
        }

        for threshold in &self.alert_thresholds {
            if *threshold <= 0.0 || *threshold >= 1.0 {
                return Err(ConfigError::Validation(format!(
                    "billing.alert_thresholds entries must be between 0 and 1, got {}",
                    threshold
                )));
            }
        }

        if self.min_recheck_minutes < 0 {
            return Err(ConfigError::Validation(
                "billing.min_recheck_minutes must not be negative".into(),
            ));
        }

        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        BillingConfig {
            default_credit_limit: default_credit_limit(),
            alert_thresholds: default_alert_thresholds(),
            min_recheck_minutes: default_min_recheck_minutes(),
            deletion_lookback_months: default_deletion_lookback_months(),
            deletion_grace_days: default_deletion_grace_days(),
            credit_billing_accounts: Vec::new(),
        }
    }
}

fn default_credit_limit() -> f64 {
    300.0
}

fn default_alert_thresholds() -> Vec<f64> {
    vec![0.5, 0.75]
}

fn default_min_recheck_minutes() -> i64 {
    120
}

fn default_deletion_lookback_months() -> i64 {
    6
}

fn default_deletion_grace_days() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.default_credit_limit, 300.0);
        assert_eq!(config.alert_thresholds, vec![0.5, 0.75]);
        assert_eq!(config.min_recheck_minutes, 120);
        assert_eq!(config.deletion_lookback_months, 6);
        assert_eq!(config.deletion_grace_days, 7);
        assert!(config.credit_billing_accounts.is_empty());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config: BillingConfig = toml::from_str("alert_thresholds = [0.5, 1.0]").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_limit_rejected() {
        let config: BillingConfig = toml::from_str("default_credit_limit = -10.0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_full_section() {
        let config: BillingConfig = toml::from_str(
            r#"
            default_credit_limit = 500.0
            alert_thresholds = [0.25, 0.5, 0.75]
            credit_billing_accounts = ["billingAccounts/ABC-123"]
        "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.alert_thresholds.len(), 3);
        assert_eq!(config.credit_billing_accounts.len(), 1);
    }
}
