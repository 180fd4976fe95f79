//! Decides which cached workspace costs are worth re-fetching.

use chrono::{DateTime, Duration, Months, Utc};

use crate::{
    config::BillingConfig,
    models::{WorkspaceActiveStatus, WorkspaceCostRecord},
};

/// Filters workspace cost records by staleness and reconciliation scope.
///
/// A record is refreshed when it is both in scope and past the re-check
/// age. Scope also determines which cached costs count toward a user's
/// previous aggregate, so the two gates are exposed separately.
#[derive(Debug, Clone)]
pub struct StalenessFilter {
    min_recheck_minutes: i64,
    deletion_lookback_months: i64,
    deletion_grace_days: i64,
}

impl StalenessFilter {
    pub fn from_config(config: &BillingConfig) -> Self {
        Self {
            min_recheck_minutes: config.min_recheck_minutes,
            deletion_lookback_months: config.deletion_lookback_months,
            deletion_grace_days: config.deletion_grace_days,
        }
    }

    /// The cached cost has never been updated, or its last update is
    /// older than the minimum re-check age.
    pub fn needs_recheck(&self, record: &WorkspaceCostRecord, now: DateTime<Utc>) -> bool {
        match record.cached_cost_update_time {
            None => true,
            Some(updated) => now - updated > Duration::minutes(self.min_recheck_minutes),
        }
    }

    /// Whether the workspace still participates in reconciliation.
    ///
    /// Active workspaces always do. Deleted workspaces participate while
    /// the deletion is within the lookback window and the cached cost
    /// has not already been settled: an update more than the grace
    /// period after deletion means the final cost was captured.
    pub fn in_scope(&self, record: &WorkspaceCostRecord, now: DateTime<Utc>) -> bool {
        match record.active_status {
            WorkspaceActiveStatus::Active => true,
            WorkspaceActiveStatus::Deleted => {
                let deleted_at = record.workspace_last_modified_time;
                let lookback_cutoff = now
                    .checked_sub_months(Months::new(self.deletion_lookback_months.max(0) as u32))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                if deleted_at < lookback_cutoff {
                    return false;
                }

                match record.cached_cost_update_time {
                    None => true,
                    // An update before deletion misses charges accrued at
                    // teardown; an update within the grace window may too.
                    Some(updated) => updated < deleted_at + Duration::days(self.deletion_grace_days),
                }
            }
        }
    }

    /// Both gates: the record should be re-fetched from the cost source.
    pub fn should_refresh(&self, record: &WorkspaceCostRecord, now: DateTime<Utc>) -> bool {
        self.in_scope(record, now) && self.needs_recheck(record, now)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::BillingAccessStatus;

    fn filter() -> StalenessFilter {
        StalenessFilter::from_config(&BillingConfig::default())
    }

    fn record(
        active_status: WorkspaceActiveStatus,
        last_modified: DateTime<Utc>,
        cached_update: Option<DateTime<Utc>>,
    ) -> WorkspaceCostRecord {
        WorkspaceCostRecord {
            workspace_id: Uuid::new_v4(),
            cloud_project: Some("proj".into()),
            creator_id: Uuid::new_v4(),
            billing_account: "billingAccounts/credits".into(),
            cached_cost: 10.0,
            cached_cost_update_time: cached_update,
            active_status,
            workspace_last_modified_time: last_modified,
            billing_access_status: BillingAccessStatus::Active,
        }
    }

    #[test]
    fn test_never_updated_needs_recheck() {
        let now = Utc::now();
        let r = record(WorkspaceActiveStatus::Active, now, None);
        assert!(filter().needs_recheck(&r, now));
        assert!(filter().should_refresh(&r, now));
    }

    #[test]
    fn test_fresh_update_skipped() {
        let now = Utc::now();
        let r = record(
            WorkspaceActiveStatus::Active,
            now,
            Some(now - Duration::minutes(30)),
        );
        assert!(!filter().needs_recheck(&r, now));
        assert!(!filter().should_refresh(&r, now));
    }

    #[test]
    fn test_update_at_exact_boundary_not_stale() {
        let now = Utc::now();
        let r = record(
            WorkspaceActiveStatus::Active,
            now,
            Some(now - Duration::minutes(120)),
        );
        assert!(!filter().needs_recheck(&r, now));
    }

    #[test]
    fn test_update_past_boundary_is_stale() {
        let now = Utc::now();
        let r = record(
            WorkspaceActiveStatus::Active,
            now,
            Some(now - Duration::minutes(121)),
        );
        assert!(filter().needs_recheck(&r, now));
    }

    #[test]
    fn test_deleted_beyond_lookback_excluded() {
        let now = Utc::now();
        let r = record(
            WorkspaceActiveStatus::Deleted,
            now - Duration::days(365),
            None,
        );
        assert!(!filter().in_scope(&r, now));
        assert!(!filter().should_refresh(&r, now));
    }

    #[test]
    fn test_deleted_recently_in_scope_until_settled() {
        let now = Utc::now();
        let deleted_at = now - Duration::days(30);

        // Never updated: still owed a final cost capture.
        let r = record(WorkspaceActiveStatus::Deleted, deleted_at, None);
        assert!(filter().in_scope(&r, now));

        // Updated before deletion: teardown charges may be missing.
        let r = record(
            WorkspaceActiveStatus::Deleted,
            deleted_at,
            Some(deleted_at - Duration::days(1)),
        );
        assert!(filter().in_scope(&r, now));

        // Updated within the grace window after deletion.
        let r = record(
            WorkspaceActiveStatus::Deleted,
            deleted_at,
            Some(deleted_at + Duration::days(7) - Duration::seconds(1)),
        );
        assert!(filter().in_scope(&r, now));

        // Updated at or past the grace boundary: final cost captured.
        let r = record(
            WorkspaceActiveStatus::Deleted,
            deleted_at,
            Some(deleted_at + Duration::days(7)),
        );
        assert!(!filter().in_scope(&r, now));
    }
}
