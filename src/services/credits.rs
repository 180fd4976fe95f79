//! User-facing credit queries and limit override management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    credits::{
        BillingStatusController,
        compare::{cost_exceeds, costs_differ},
    },
    db::{DbError, DbResult, UserRepo, WorkspaceRepo},
    models::User,
};

#[derive(Debug, thiserror::Error)]
pub enum CreditsServiceError {
    #[error("User not found")]
    UserNotFound,

    #[error("User credits have expired; the limit cannot be changed")]
    CreditsExpired,

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Read-side credit queries plus the single write path for per-user
/// limit overrides.
pub struct CreditsService {
    users: Arc<dyn UserRepo>,
    workspaces: Arc<dyn WorkspaceRepo>,
    status: BillingStatusController,
    default_limit: f64,
}

impl CreditsService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        workspaces: Arc<dyn WorkspaceRepo>,
        status: BillingStatusController,
        default_limit: f64,
    ) -> Self {
        Self {
            users,
            workspaces,
            status,
            default_limit,
        }
    }

    /// Total cached spend across the user's workspaces. Reads the cost
    /// cache only; it can lag live spend by up to the re-check age.
    pub async fn cached_usage(&self, user_id: Uuid) -> DbResult<f64> {
        Ok(self
            .workspaces
            .total_cached_cost_by_creator(user_id)
            .await?
            .unwrap_or(0.0))
    }

    pub fn credit_limit(&self, user: &User) -> f64 {
        user.credit_limit_override.unwrap_or(self.default_limit)
    }

    /// Credits left before the limit, floored at zero.
    pub async fn remaining_credits(&self, user: &User) -> DbResult<f64> {
        let usage = self.cached_usage(user.id).await?;
        Ok((self.credit_limit(user) - usage).max(0.0))
    }

    pub async fn has_exhausted_credits(&self, user: &User) -> DbResult<bool> {
        let usage = self.cached_usage(user.id).await?;
        Ok(cost_exceeds(usage, self.credit_limit(user)))
    }

    /// Set a per-user credit limit override.
    ///
    /// Returns false without writing when the user has no existing
    /// override and the requested value matches the default: storing it
    /// would freeze the user out of future default changes. Rejected
    /// outright for users whose credits have expired. When the new
    /// limit puts the user back under it, their credit-funded
    /// workspaces are reactivated immediately.
    pub async fn maybe_set_limit_override(
        &self,
        user_id: Uuid,
        new_limit: f64,
        now: DateTime<Utc>,
    ) -> Result<bool, CreditsServiceError> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(CreditsServiceError::UserNotFound)?;

        if let Some(state) = self.users.get_credit_state(user_id).await? {
            if state.is_expired(now) {
                return Err(CreditsServiceError::CreditsExpired);
            }
        }

        if user.credit_limit_override.is_none() && !costs_differ(new_limit, self.default_limit) {
            return Ok(false);
        }

        self.users
            .set_credit_limit_override(user_id, Some(new_limit))
            .await?;

        let usage = self.cached_usage(user_id).await?;
        if !cost_exceeds(usage, new_limit) {
            let reactivated = self.status.reactivate_credit_workspaces(user_id).await?;
            if reactivated > 0 {
                tracing::info!(
                    user_id = %user_id,
                    new_limit,
                    workspaces = reactivated,
                    "Raised credit limit reactivated workspaces"
                );
            }
        }

        Ok(true)
    }
}
