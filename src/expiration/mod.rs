//! Credit expiration lifecycle: warnings, expiry cleanup, extensions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    compute::ComputeClient,
    config::ExpirationConfig,
    credits::BillingStatusController,
    db::{DbError, DbResult, UserRepo, WorkspaceRepo},
    models::{User, UserCreditState, WorkspaceActiveStatus},
    notify::{Notification, NotificationSender},
};

/// Results from a single expiration sweep.
#[derive(Debug, Default)]
pub struct ExpirationRunResult {
    pub users_checked: usize,
    pub warnings_sent: usize,
    pub users_expired: usize,
    pub errors: usize,
}

impl ExpirationRunResult {
    pub fn has_changes(&self) -> bool {
        self.warnings_sent > 0 || self.users_expired > 0
    }
}

/// Why a credit extension was refused.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("User has no credit state")]
    NoCreditState,

    #[error("User credits are bypassed and never expire")]
    Bypassed,

    #[error("Credits have already been extended once")]
    AlreadyExtended,

    #[error("Credits have already expired and been cleaned up")]
    AlreadyCleanedUp,

    #[error("Credits are not close enough to expiring")]
    NotExpiringSoon,

    #[error(transparent)]
    Db(#[from] DbError),
}

/// The only writer of credit lifecycle state.
///
/// Sweeps every user with a credit window: sends the expiration warning
/// once inside the warning window, and on expiry tears workspaces down
/// and records the cleanup. Also owns the one-time extension and the
/// bypass flag.
pub struct ExpirationManager {
    users: Arc<dyn UserRepo>,
    workspaces: Arc<dyn WorkspaceRepo>,
    notifier: Arc<dyn NotificationSender>,
    compute: Arc<dyn ComputeClient>,
    status: BillingStatusController,
    config: ExpirationConfig,
}

impl ExpirationManager {
    pub fn new(
        users: Arc<dyn UserRepo>,
        workspaces: Arc<dyn WorkspaceRepo>,
        notifier: Arc<dyn NotificationSender>,
        compute: Arc<dyn ComputeClient>,
        status: BillingStatusController,
        config: ExpirationConfig,
    ) -> Self {
        Self {
            users,
            workspaces,
            notifier,
            compute,
            status,
            config,
        }
    }

    /// Fetch the user's credit window, creating it on first touch with
    /// the configured validity period.
    pub async fn ensure_credit_state(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<UserCreditState> {
        if let Some(existing) = self.users.get_credit_state(user_id).await? {
            return Ok(existing);
        }

        let state = UserCreditState {
            user_id,
            credit_start_time: now,
            expiration_time: Some(now + Duration::days(self.config.validity_days)),
            extension_time: None,
            warning_sent_time: None,
            cleanup_time: None,
            bypassed: false,
        };

        match self.users.create_credit_state(&state).await {
            Ok(()) => Ok(state),
            // Lost a creation race; the winner's state is authoritative.
            Err(DbError::Conflict(_)) => self
                .users
                .get_credit_state(user_id)
                .await?
                .ok_or(DbError::NotFound),
            Err(e) => Err(e),
        }
    }

    /// One sweep over every user with a credit window.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> DbResult<ExpirationRunResult> {
        let mut result = ExpirationRunResult::default();

        let user_ids = self.users.list_user_ids_with_credit_state().await?;
        for user_id in user_ids {
            result.users_checked += 1;
            if let Err(e) = self.sweep_user(user_id, now, &mut result).await {
                result.errors += 1;
                tracing::error!(user_id = %user_id, error = %e, "Expiration sweep failed for user");
            }
        }

        Ok(result)
    }

    async fn sweep_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        result: &mut ExpirationRunResult,
    ) -> DbResult<()> {
        let state = match self.users.get_credit_state(user_id).await? {
            Some(state) => state,
            None => return Ok(()),
        };
        if state.bypassed || state.cleanup_time.is_some() {
            return Ok(());
        }
        let expiration = match state.effective_expiration() {
            Some(exp) => exp,
            None => return Ok(()),
        };

        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(DbError::NotFound)?;

        if now >= expiration {
            self.handle_expiry(&user, now).await?;
            result.users_expired += 1;
        } else if expiration - now <= Duration::days(self.config.warning_days)
            && state.warning_sent_time.is_none()
        {
            let notification = Notification::ExpirationWarning {
                user_id,
                email: user.email.clone(),
                expiration_time: expiration,
            };
            match self.notifier.send(&notification).await {
                // Recorded only on success so the next sweep retries.
                Ok(()) => {
                    self.users.record_expiration_warning_sent(user_id, now).await?;
                    result.warnings_sent += 1;
                }
                Err(e) => {
                    result.errors += 1;
                    tracing::error!(
                        user_id = %user_id,
                        error = %e,
                        "Failed to deliver expiration warning, will retry next sweep"
                    );
                }
            }
        }

        Ok(())
    }

    /// Tear down the user's credit-funded workspaces and close the
    /// credit window.
    ///
    /// Each per-workspace step is independently caught: one stuck
    /// runtime must not leave the rest of the user's spend running.
    async fn handle_expiry(&self, user: &User, now: DateTime<Utc>) -> DbResult<()> {
        tracing::info!(user_id = %user.id, "User credits expired, cleaning up workspaces");

        if let Err(e) = self.status.deactivate_credit_workspaces(user.id).await {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "Failed to deactivate workspaces for expired user"
            );
        }

        for workspace in self.workspaces.find_by_creator(user.id).await? {
            if workspace.active_status != WorkspaceActiveStatus::Active
                || !self.status.is_credit_funded(&workspace.billing_account)
            {
                continue;
            }
            let cloud_project = match &workspace.cloud_project {
                Some(p) => p,
                None => continue,
            };

            if let Err(e) = self.compute.delete_runtimes(cloud_project).await {
                tracing::error!(
                    workspace_id = %workspace.id,
                    cloud_project = %cloud_project,
                    error = %e,
                    "Failed to delete runtimes for expired user"
                );
            }
            if self.config.unlink_billing_account {
                if let Err(e) = self.compute.unlink_billing_account(cloud_project).await {
                    tracing::error!(
                        workspace_id = %workspace.id,
                        cloud_project = %cloud_project,
                        error = %e,
                        "Failed to unlink billing account for expired user"
                    );
                }
            }
        }

        self.users.record_expiration_cleanup(user.id, now).await?;

        let notification = Notification::CreditsExpired {
            user_id: user.id,
            email: user.email.clone(),
        };
        if let Err(e) = self.notifier.send(&notification).await {
            // Cleanup is already recorded; the notice is not retried.
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "Failed to deliver expiration notice"
            );
        }

        Ok(())
    }

    /// Push the expiration out once, to the extension period measured
    /// from the original credit start.
    pub async fn extend_credits(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<UserCreditState, ExtensionError> {
        let state = self
            .users
            .get_credit_state(user_id)
            .await?
            .ok_or(ExtensionError::NoCreditState)?;

        if state.bypassed {
            return Err(ExtensionError::Bypassed);
        }
        if state.cleanup_time.is_some() {
            return Err(ExtensionError::AlreadyCleanedUp);
        }
        if state.has_been_extended() {
            return Err(ExtensionError::AlreadyExtended);
        }
        let expiration = state
            .expiration_time
            .ok_or(ExtensionError::NotExpiringSoon)?;
        if expiration - now > Duration::days(self.config.warning_days) {
            return Err(ExtensionError::NotExpiringSoon);
        }

        let new_expiration =
            state.credit_start_time + Duration::days(self.config.extension_period_days);
        self.users
            .record_credit_extension(user_id, new_expiration, now)
            .await?;

        tracing::info!(
            user_id = %user_id,
            new_expiration = %new_expiration,
            "Extended user credits"
        );

        self.users
            .get_credit_state(user_id)
            .await?
            .ok_or(ExtensionError::NoCreditState)
    }

    /// Exempt (or re-subject) a user from credit expiration entirely.
    pub async fn set_bypassed(&self, user_id: Uuid, bypassed: bool) -> DbResult<()> {
        self.users.set_credit_bypassed(user_id, bypassed).await?;
        tracing::info!(user_id = %user_id, bypassed, "Updated credit expiration bypass");
        Ok(())
    }
}
