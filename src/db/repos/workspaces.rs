use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{
        BillingAccessStatus, CostUpdate, CreateWorkspace, Workspace, WorkspaceCostRecord,
    },
};

/// Persistence for workspaces and their cached cost snapshots.
///
/// The reconciler is the only caller of [`WorkspaceRepo::upsert_costs`]; the
/// billing status controller (and the limit-override and expiration paths that
/// reuse it) is the only caller of the status setters.
#[async_trait]
pub trait WorkspaceRepo: Send + Sync {
    async fn create(&self, workspace: CreateWorkspace) -> DbResult<Workspace>;

    async fn get(&self, id: Uuid) -> DbResult<Option<Workspace>>;

    /// Mark a workspace deleted and bump its last-modified time.
    async fn mark_deleted(&self, id: Uuid) -> DbResult<()>;

    /// Cost records for every workspace whose creator is in `creator_ids`,
    /// joined with the cached cost snapshot. Workspaces without a snapshot
    /// read as cost 0.0 with no update time.
    async fn get_cost_records(&self, creator_ids: &[Uuid]) -> DbResult<Vec<WorkspaceCostRecord>>;

    /// Apply a batch of cost-cache writes in a single transaction.
    ///
    /// Either every change commits or none does; a batch abandoned mid-way
    /// leaves the cache untouched.
    async fn upsert_costs(&self, changes: &[CostUpdate]) -> DbResult<usize>;

    /// Sum of cached costs across all workspaces created by this user.
    /// None when the user has no cost-cache rows at all.
    async fn total_cached_cost_by_creator(&self, creator_id: Uuid) -> DbResult<Option<f64>>;

    /// All workspaces created by this user.
    async fn find_by_creator(&self, creator_id: Uuid) -> DbResult<Vec<Workspace>>;

    /// Set the billing access status of one workspace. Idempotent.
    async fn set_billing_access_status(
        &self,
        workspace_id: Uuid,
        status: BillingAccessStatus,
    ) -> DbResult<()>;

    /// Of the given users, those who still have at least one ACTIVE-access
    /// workspace funded by one of the given billing accounts. Used to find
    /// users whose workspaces have not already been deactivated.
    async fn find_creators_with_active_billing_in(
        &self,
        creator_ids: &[Uuid],
        billing_accounts: &[String],
    ) -> DbResult<Vec<Uuid>>;
}
