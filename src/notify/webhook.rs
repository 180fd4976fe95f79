use std::time::Duration;

use async_trait::async_trait;

use super::{Notification, NotificationSender, NotifyError};
use crate::config::NotificationsConfig;

/// Delivers notifications as JSON POSTs to a webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn from_config(config: &NotificationsConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            // Callers only construct this when a URL is configured.
            url: config.webhook_url.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl NotificationSender for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(notification).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    use super::*;

    fn config(url: String) -> NotificationsConfig {
        NotificationsConfig {
            webhook_url: Some(url),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_sends_threshold_alert() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "kind": "usage_threshold",
                "threshold": 0.5,
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::from_config(&config(server.uri())).unwrap();
        notifier
            .send(&Notification::UsageThreshold {
                user_id: Uuid::new_v4(),
                email: "user@example.com".into(),
                threshold: 0.5,
                current_cost: 160.0,
                credit_limit: 300.0,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::from_config(&config(server.uri())).unwrap();
        let err = notifier
            .send(&Notification::CreditsExpired {
                user_id: Uuid::new_v4(),
                email: "user@example.com".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Status { status: 500, .. }));
    }
}
