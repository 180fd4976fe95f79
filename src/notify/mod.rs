//! Outbound notifications for usage alerts and credit expiration.
//!
//! Notifications are delivered as JSON to a configured webhook. Without
//! a webhook URL they are logged and dropped, which keeps local
//! deployments working without an alerting stack.

mod recording;
mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use recording::RecordingNotifier;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
pub use webhook::WebhookNotifier;

use crate::config::NotificationsConfig;

/// Errors from delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// A user-facing notification about their subsidized credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Usage crossed an alert threshold but credits remain.
    UsageThreshold {
        user_id: Uuid,
        email: String,
        threshold: f64,
        current_cost: f64,
        credit_limit: f64,
    },
    /// Usage reached or exceeded the credit limit.
    CreditsExhausted {
        user_id: Uuid,
        email: String,
        current_cost: f64,
        credit_limit: f64,
    },
    /// Credits expire soon.
    ExpirationWarning {
        user_id: Uuid,
        email: String,
        expiration_time: DateTime<Utc>,
    },
    /// Credits have expired and workspaces were cleaned up.
    CreditsExpired { user_id: Uuid, email: String },
}

impl Notification {
    pub fn user_id(&self) -> Uuid {
        match self {
            Notification::UsageThreshold { user_id, .. }
            | Notification::CreditsExhausted { user_id, .. }
            | Notification::ExpirationWarning { user_id, .. }
            | Notification::CreditsExpired { user_id, .. } => *user_id,
        }
    }
}

/// Delivery channel for notifications.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Build the configured sender. Falls back to log-and-drop when no
/// webhook is configured.
pub fn from_config(config: &NotificationsConfig) -> Result<Arc<dyn NotificationSender>, NotifyError> {
    match &config.webhook_url {
        Some(_) => Ok(Arc::new(WebhookNotifier::from_config(config)?)),
        None => Ok(Arc::new(LoggingNotifier)),
    }
}

/// Logs notifications instead of delivering them.
pub struct LoggingNotifier;

#[async_trait]
impl NotificationSender for LoggingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            user_id = %notification.user_id(),
            notification = ?notification,
            "No webhook configured, dropping notification"
        );
        Ok(())
    }
}
