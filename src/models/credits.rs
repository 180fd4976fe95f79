use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    /// Per-user credit limit override in USD. None means the configured
    /// default limit applies.
    pub credit_limit_override: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
}

/// Credit validity window for one user.
///
/// Created lazily the first time a user becomes eligible for credits.
/// `expiration_time` is fixed at creation and may be pushed out exactly once,
/// recorded via `extension_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreditState {
    pub user_id: Uuid,
    pub credit_start_time: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    /// Presence means the one-time extension has been used.
    pub extension_time: Option<DateTime<Utc>>,
    pub warning_sent_time: Option<DateTime<Utc>>,
    pub cleanup_time: Option<DateTime<Utc>>,
    pub bypassed: bool,
}

impl UserCreditState {
    /// The expiration that actually applies: None when bypassed.
    pub fn effective_expiration(&self) -> Option<DateTime<Utc>> {
        if self.bypassed {
            None
        } else {
            self.expiration_time
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.effective_expiration().is_some_and(|exp| exp <= now)
    }

    pub fn has_been_extended(&self) -> bool {
        self.extension_time.is_some()
    }
}
