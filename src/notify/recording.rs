use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Notification, NotificationSender, NotifyError};

/// Records notifications in memory for assertions in tests.
///
/// Individual users can be marked as failing to exercise the paths
/// where delivery errors must not corrupt persisted state.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing_users: Mutex<Vec<Uuid>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| n.user_id() == user_id)
            .collect()
    }

    /// Fail every delivery addressed to this user.
    pub fn fail_for(&self, user_id: Uuid) {
        if let Ok(mut failing) = self.failing_users.lock() {
            failing.push(user_id);
        }
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let failing = self
            .failing_users
            .lock()
            .map(|f| f.contains(&notification.user_id()))
            .unwrap_or(false);
        if failing {
            return Err(NotifyError::Status {
                status: 502,
                body: "synthetic delivery failure".into(),
            });
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}
