//! Partitions the user population and drives the per-batch pipeline.

use std::{collections::HashSet, sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use uuid::Uuid;

use super::{
    EngineError,
    alerts::ThresholdAlertEngine,
    reconciler::Reconciler,
    status::BillingStatusController,
};
use crate::db::UserRepo;

/// Results from a single reconciliation run over all users.
#[derive(Debug, Default)]
pub struct ReconciliationRunResult {
    pub users_processed: usize,
    pub batches: usize,
    pub batches_failed: usize,
    pub costs_updated: usize,
    pub alerts_sent: usize,
    pub users_deactivated: usize,
    pub workspaces_deactivated: usize,
    pub duration_ms: u64,
}

impl ReconciliationRunResult {
    pub fn has_changes(&self) -> bool {
        self.costs_updated > 0 || self.alerts_sent > 0 || self.users_deactivated > 0
    }
}

#[derive(Debug, Default)]
struct BatchStats {
    costs_updated: usize,
    alerts_sent: usize,
    users_deactivated: usize,
    workspaces_deactivated: usize,
}

/// Runs the reconcile → alert → deactivate pipeline batch by batch.
///
/// Users are partitioned by id, so one user's workspaces always land in
/// the same batch. Batches are independent: a failed batch is logged
/// and skipped while the rest of the run continues.
pub struct BatchOrchestrator {
    users: Arc<dyn UserRepo>,
    reconciler: Reconciler,
    alerts: ThresholdAlertEngine,
    status: BillingStatusController,
    batch_size: usize,
    concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(
        users: Arc<dyn UserRepo>,
        reconciler: Reconciler,
        alerts: ThresholdAlertEngine,
        status: BillingStatusController,
        batch_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            users,
            reconciler,
            alerts,
            status,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// One full reconciliation pass over every user.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ReconciliationRunResult, EngineError> {
        let start = Instant::now();
        let user_ids = self.users.list_user_ids().await?;

        let mut result = ReconciliationRunResult {
            users_processed: user_ids.len(),
            ..Default::default()
        };

        let batches: Vec<Vec<Uuid>> = user_ids
            .chunks(self.batch_size)
            .map(|c| c.to_vec())
            .collect();
        result.batches = batches.len();

        let outcomes: Vec<Result<BatchStats, EngineError>> = futures::stream::iter(batches)
            .map(|batch| async move { self.process_batch(&batch, now).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Ok(stats) => {
                    result.costs_updated += stats.costs_updated;
                    result.alerts_sent += stats.alerts_sent;
                    result.users_deactivated += stats.users_deactivated;
                    result.workspaces_deactivated += stats.workspaces_deactivated;
                }
                Err(e) => {
                    result.batches_failed += 1;
                    tracing::error!(error = %e, "Reconciliation batch failed, skipping");
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn process_batch(
        &self,
        user_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<BatchStats, EngineError> {
        let mut stats = BatchStats::default();

        let outcome = self.reconciler.reconcile_batch(user_ids, now).await?;
        stats.costs_updated = outcome.costs_updated;

        let changed = outcome.view.changed_users();
        if changed.is_empty() {
            return Ok(stats);
        }

        let users = self.users.find_by_ids(&changed).await?;
        let expired: HashSet<Uuid> = self
            .users
            .find_credit_states(&changed)
            .await?
            .into_iter()
            .filter(|state| state.is_expired(now))
            .map(|state| state.user_id)
            .collect();

        let alert_outcome = self.alerts.process(&outcome.view, &users, &expired).await;
        stats.alerts_sent = alert_outcome.alerts_sent;

        let to_deactivate = self
            .status
            .with_active_credit_workspaces(&alert_outcome.newly_exhausted)
            .await?;
        for user_id in to_deactivate {
            match self.status.deactivate_credit_workspaces(user_id).await {
                Ok(workspaces) => {
                    stats.users_deactivated += 1;
                    stats.workspaces_deactivated += workspaces;
                }
                Err(e) => {
                    tracing::error!(
                        user_id = %user_id,
                        error = %e,
                        "Failed to deactivate workspaces for exhausted user"
                    );
                }
            }
        }

        Ok(stats)
    }
}
