//! Refreshes cached workspace costs from the cost source.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    EngineError,
    aggregate::AggregateCostView,
    compare::{cost_exceeds, costs_differ},
    staleness::StalenessFilter,
};
use crate::{
    costsource::CostSource,
    db::WorkspaceRepo,
    models::CostUpdate,
};

/// Counters and the aggregate view from one reconciled batch.
#[derive(Debug, Default)]
pub struct BatchReconcileOutcome {
    pub view: AggregateCostView,
    /// Cost cache rows written.
    pub costs_updated: usize,
    /// Records dropped for having no cloud project.
    pub skipped_no_project: usize,
    /// Refreshed projects absent from the cost source response.
    pub unknown_projects: usize,
    /// Live costs lower than the cached value.
    pub anomalies: usize,
}

/// Reconciles one batch of users' cached workspace costs.
///
/// Issues a single cost source query per batch and commits all cache
/// writes in one transaction. A cost source failure aborts the batch
/// before anything is written.
pub struct Reconciler {
    workspaces: Arc<dyn WorkspaceRepo>,
    cost_source: Arc<dyn CostSource>,
    filter: StalenessFilter,
}

impl Reconciler {
    pub fn new(
        workspaces: Arc<dyn WorkspaceRepo>,
        cost_source: Arc<dyn CostSource>,
        filter: StalenessFilter,
    ) -> Self {
        Self {
            workspaces,
            cost_source,
            filter,
        }
    }

    pub async fn reconcile_batch(
        &self,
        user_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<BatchReconcileOutcome, EngineError> {
        let mut outcome = BatchReconcileOutcome::default();

        let records = self.workspaces.get_cost_records(user_ids).await?;
        let in_scope: Vec<_> = records
            .iter()
            .filter(|r| self.filter.in_scope(r, now))
            .collect();

        for record in &in_scope {
            outcome.view.add_previous(record.creator_id, record.cached_cost);
        }

        // Records to refresh this pass, minus those we cannot query.
        let mut refresh = Vec::new();
        let mut projects = Vec::new();
        for record in &in_scope {
            if !self.filter.needs_recheck(record, now) {
                continue;
            }
            match &record.cloud_project {
                Some(project) => {
                    if !projects.contains(project) {
                        projects.push(project.clone());
                    }
                    refresh.push(*record);
                }
                None => {
                    outcome.skipped_no_project += 1;
                    tracing::debug!(
                        workspace_id = %record.workspace_id,
                        "Workspace has no cloud project, skipping cost refresh"
                    );
                }
            }
        }

        // One query per batch. Failure aborts with zero writes.
        let live_costs: HashMap<String, f64> = if projects.is_empty() {
            HashMap::new()
        } else {
            self.cost_source.fetch_costs(&projects).await?
        };

        let mut changes = Vec::new();
        let mut refreshed_ids = Vec::new();
        for record in &refresh {
            let project = match &record.cloud_project {
                Some(p) => p,
                None => continue,
            };
            let live = match live_costs.get(project) {
                Some(cost) => *cost,
                None => {
                    // Cost unknown, not zero: leave the cached value alone.
                    outcome.unknown_projects += 1;
                    tracing::debug!(
                        workspace_id = %record.workspace_id,
                        cloud_project = %project,
                        "Cost source returned no figure for project"
                    );
                    continue;
                }
            };

            refreshed_ids.push(record.workspace_id);
            outcome.view.add_live(record.creator_id, live);

            if !costs_differ(record.cached_cost, live) {
                continue;
            }
            if cost_exceeds(record.cached_cost, live) {
                outcome.anomalies += 1;
                tracing::warn!(
                    workspace_id = %record.workspace_id,
                    cached_cost = record.cached_cost,
                    live_cost = live,
                    "Live cost is lower than cached cost"
                );
            }
            changes.push(CostUpdate {
                workspace_id: record.workspace_id,
                cost: live,
                update_time: now,
            });
        }

        // Carry the cached value for everything without a fresh figure so
        // the live aggregate is comparable to the previous aggregate.
        for record in &in_scope {
            if !refreshed_ids.contains(&record.workspace_id) {
                outcome.view.add_live(record.creator_id, record.cached_cost);
            }
        }

        outcome.costs_updated = self.workspaces.upsert_costs(&changes).await?;

        Ok(outcome)
    }
}
