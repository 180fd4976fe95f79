//! Threshold-crossing and exhaustion alerting.

use std::{collections::HashSet, sync::Arc};

use uuid::Uuid;

use super::{
    aggregate::AggregateCostView,
    compare::cost_exceeds,
};
use crate::{
    models::User,
    notify::{Notification, NotificationSender},
};

/// What one alerting pass did.
#[derive(Debug, Default)]
pub struct AlertOutcome {
    pub alerts_sent: usize,
    /// Users who crossed their credit limit this pass. The status
    /// controller deactivates their workspaces.
    pub newly_exhausted: Vec<Uuid>,
    /// Users whose aggregate cost went down.
    pub anomalies: usize,
}

/// Sends at most one notice per user per reconciliation pass.
///
/// Exhaustion supersedes thresholds; among thresholds only the highest
/// newly-crossed one fires. Crossings are detected by comparing the
/// previous and current aggregates, which makes re-runs over unchanged
/// costs idempotent.
pub struct ThresholdAlertEngine {
    notifier: Arc<dyn NotificationSender>,
    /// Threshold fractions sorted descending.
    thresholds: Vec<f64>,
    default_limit: f64,
}

impl ThresholdAlertEngine {
    pub fn new(
        notifier: Arc<dyn NotificationSender>,
        mut thresholds: Vec<f64>,
        default_limit: f64,
    ) -> Self {
        thresholds.sort_by(|a, b| b.total_cmp(a));
        Self {
            notifier,
            thresholds,
            default_limit,
        }
    }

    /// The credit limit applying to a user.
    pub fn credit_limit(&self, user: &User) -> f64 {
        user.credit_limit_override.unwrap_or(self.default_limit)
    }

    /// Process the changed users of one batch.
    ///
    /// `expired_users` are excluded entirely; they receive expiration
    /// notices from the expiration sweep instead.
    pub async fn process(
        &self,
        view: &AggregateCostView,
        users: &[User],
        expired_users: &HashSet<Uuid>,
    ) -> AlertOutcome {
        let mut outcome = AlertOutcome::default();

        for user in users {
            if expired_users.contains(&user.id) {
                tracing::debug!(user_id = %user.id, "User credits expired, skipping usage alerts");
                continue;
            }
            let snapshot = match view.snapshot(user.id) {
                Some(s) => s,
                None => continue,
            };

            let previous = snapshot.previous;
            let current = snapshot.current();
            if cost_exceeds(previous, current) {
                outcome.anomalies += 1;
                tracing::warn!(
                    user_id = %user.id,
                    previous_cost = previous,
                    current_cost = current,
                    "Aggregate cost decreased"
                );
            }

            let limit = self.credit_limit(user);
            if cost_exceeds(current, limit) {
                if !cost_exceeds(previous, limit) {
                    outcome.newly_exhausted.push(user.id);
                    self.send(
                        &mut outcome,
                        Notification::CreditsExhausted {
                            user_id: user.id,
                            email: user.email.clone(),
                            current_cost: current,
                            credit_limit: limit,
                        },
                    )
                    .await;
                }
                // Already exhausted before this pass: alerted previously.
                continue;
            }

            // Highest newly-crossed threshold wins; lower ones stay quiet.
            for threshold in &self.thresholds {
                let threshold_cost = limit * threshold;
                if cost_exceeds(current, threshold_cost) {
                    if !cost_exceeds(previous, threshold_cost) {
                        self.send(
                            &mut outcome,
                            Notification::UsageThreshold {
                                user_id: user.id,
                                email: user.email.clone(),
                                threshold: *threshold,
                                current_cost: current,
                                credit_limit: limit,
                            },
                        )
                        .await;
                    }
                    break;
                }
            }
        }

        outcome
    }

    async fn send(&self, outcome: &mut AlertOutcome, notification: Notification) {
        match self.notifier.send(&notification).await {
            Ok(()) => outcome.alerts_sent += 1,
            Err(e) => {
                tracing::error!(
                    user_id = %notification.user_id(),
                    error = %e,
                    "Failed to deliver usage notification"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        credits::aggregate::AggregateCostView,
        notify::RecordingNotifier,
    };

    fn user(limit_override: Option<f64>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            name: "Test User".into(),
            credit_limit_override: limit_override,
            created_at: now,
            updated_at: now,
        }
    }

    fn view(user_id: Uuid, previous: f64, live: f64) -> AggregateCostView {
        let mut v = AggregateCostView::new();
        v.add_previous(user_id, previous);
        v.add_live(user_id, live);
        v
    }

    fn engine(notifier: Arc<RecordingNotifier>) -> ThresholdAlertEngine {
        ThresholdAlertEngine::new(notifier, vec![0.5, 0.75], 300.0)
    }

    #[tokio::test]
    async fn test_single_threshold_alert_per_crossing() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(None);

        // Jumps over both 50% and 75% in one pass: only 75% fires.
        let outcome = engine
            .process(&view(u.id, 100.0, 250.0), &[u.clone()], &HashSet::new())
            .await;

        assert_eq!(outcome.alerts_sent, 1);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Notification::UsageThreshold { threshold, .. } => assert_eq!(*threshold, 0.75),
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_alert_without_crossing() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(None);

        // Already past 50% before the pass; still below 75%.
        let outcome = engine
            .process(&view(u.id, 160.0, 170.0), &[u.clone()], &HashSet::new())
            .await;

        assert_eq!(outcome.alerts_sent, 0);
        assert!(notifier.sent().is_empty());
        assert!(outcome.newly_exhausted.is_empty());
    }

    #[tokio::test]
    async fn test_exhaustion_supersedes_thresholds() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(None);

        let outcome = engine
            .process(&view(u.id, 100.0, 400.0), &[u.clone()], &HashSet::new())
            .await;

        assert_eq!(outcome.newly_exhausted, vec![u.id]);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], Notification::CreditsExhausted { .. }));
    }

    #[tokio::test]
    async fn test_already_exhausted_stays_quiet() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(None);

        let outcome = engine
            .process(&view(u.id, 350.0, 400.0), &[u.clone()], &HashSet::new())
            .await;

        assert!(outcome.newly_exhausted.is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_partial_previous_does_not_skip_crossing() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(None);

        // Previous aggregate sits just below 50%; the refresh tips it over.
        let outcome = engine
            .process(&view(u.id, 149.99, 150.02), &[u.clone()], &HashSet::new())
            .await;

        assert_eq!(outcome.alerts_sent, 1);
        match &notifier.sent()[0] {
            Notification::UsageThreshold { threshold, .. } => assert_eq!(*threshold, 0.5),
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_users_excluded() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(None);
        let expired: HashSet<Uuid> = [u.id].into_iter().collect();

        let outcome = engine
            .process(&view(u.id, 100.0, 400.0), &[u.clone()], &expired)
            .await;

        assert_eq!(outcome.alerts_sent, 0);
        assert!(outcome.newly_exhausted.is_empty());
    }

    #[tokio::test]
    async fn test_empty_thresholds_degrade_to_exhaustion_only() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = ThresholdAlertEngine::new(notifier.clone(), vec![], 300.0);
        let u = user(None);

        let outcome = engine
            .process(&view(u.id, 100.0, 250.0), &[u.clone()], &HashSet::new())
            .await;
        assert_eq!(outcome.alerts_sent, 0);

        let outcome = engine
            .process(&view(u.id, 250.0, 350.0), &[u.clone()], &HashSet::new())
            .await;
        assert_eq!(outcome.newly_exhausted, vec![u.id]);
    }

    #[tokio::test]
    async fn test_override_limit_used_for_thresholds() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(Some(1000.0));

        // 400 is past half of 300 but below half of the 1000 override.
        let outcome = engine
            .process(&view(u.id, 100.0, 400.0), &[u.clone()], &HashSet::new())
            .await;

        assert_eq!(outcome.alerts_sent, 0);
        assert!(outcome.newly_exhausted.is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_still_marks_exhausted() {
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = engine(notifier.clone());
        let u = user(None);
        notifier.fail_for(u.id);

        let outcome = engine
            .process(&view(u.id, 100.0, 400.0), &[u.clone()], &HashSet::new())
            .await;

        assert_eq!(outcome.alerts_sent, 0);
        assert_eq!(outcome.newly_exhausted, vec![u.id]);
    }
}
