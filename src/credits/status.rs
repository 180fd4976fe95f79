//! Billing access control for credit-funded workspaces.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{DbResult, WorkspaceRepo},
    models::{BillingAccessStatus, WorkspaceActiveStatus},
};

/// The only writer of workspace billing access status.
///
/// Only credit-funded workspaces are ever touched: a workspace on a
/// user-provided billing account spends the user's own money and stays
/// active no matter what the credit position looks like.
pub struct BillingStatusController {
    workspaces: Arc<dyn WorkspaceRepo>,
    credit_billing_accounts: Vec<String>,
}

impl BillingStatusController {
    pub fn new(workspaces: Arc<dyn WorkspaceRepo>, credit_billing_accounts: Vec<String>) -> Self {
        Self {
            workspaces,
            credit_billing_accounts,
        }
    }

    pub fn is_credit_funded(&self, billing_account: &str) -> bool {
        self.credit_billing_accounts
            .iter()
            .any(|a| a == billing_account)
    }

    /// Disable billing access on every active credit-funded workspace
    /// of the user. Returns how many workspaces were flipped.
    pub async fn deactivate_credit_workspaces(&self, user_id: Uuid) -> DbResult<usize> {
        self.set_credit_workspaces(user_id, BillingAccessStatus::Inactive)
            .await
    }

    /// Re-enable billing access, the inverse of deactivation. Used when
    /// a raised limit puts the user back under their credit limit.
    pub async fn reactivate_credit_workspaces(&self, user_id: Uuid) -> DbResult<usize> {
        self.set_credit_workspaces(user_id, BillingAccessStatus::Active)
            .await
    }

    /// Of the given users, those who still have at least one active
    /// credit-funded workspace. Deactivation fan-out is limited to these.
    pub async fn with_active_credit_workspaces(&self, user_ids: &[Uuid]) -> DbResult<Vec<Uuid>> {
        if user_ids.is_empty() || self.credit_billing_accounts.is_empty() {
            return Ok(vec![]);
        }
        self.workspaces
            .find_creators_with_active_billing_in(user_ids, &self.credit_billing_accounts)
            .await
    }

    async fn set_credit_workspaces(
        &self,
        user_id: Uuid,
        target: BillingAccessStatus,
    ) -> DbResult<usize> {
        let workspaces = self.workspaces.find_by_creator(user_id).await?;

        let mut changed = 0;
        for workspace in workspaces {
            if workspace.active_status != WorkspaceActiveStatus::Active
                || !self.is_credit_funded(&workspace.billing_account)
                || workspace.billing_access_status == target
            {
                continue;
            }

            self.workspaces
                .set_billing_access_status(workspace.id, target)
                .await?;
            changed += 1;

            tracing::info!(
                user_id = %user_id,
                workspace_id = %workspace.id,
                status = %target,
                "Updated workspace billing access"
            );
        }

        Ok(changed)
    }
}
