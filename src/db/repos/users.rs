use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateUser, User, UserCreditState},
};

/// Persistence for users and their credit lifecycle state.
///
/// The expiration manager is the only writer of the credit-state lifecycle
/// fields (warning, cleanup, extension times).
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: CreateUser) -> DbResult<User>;

    async fn get(&self, id: Uuid) -> DbResult<Option<User>>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> DbResult<Vec<User>>;

    /// Every user id, in stable order. The batch orchestrator partitions this.
    async fn list_user_ids(&self) -> DbResult<Vec<Uuid>>;

    async fn set_credit_limit_override(&self, id: Uuid, limit: Option<f64>) -> DbResult<()>;

    // ==================== Credit lifecycle state ====================

    async fn get_credit_state(&self, user_id: Uuid) -> DbResult<Option<UserCreditState>>;

    /// Credit states for a batch of users. Users without one are absent
    /// from the result.
    async fn find_credit_states(&self, user_ids: &[Uuid]) -> DbResult<Vec<UserCreditState>>;

    /// Insert the credit window for a user. Fails with `Conflict` if one
    /// already exists.
    async fn create_credit_state(&self, state: &UserCreditState) -> DbResult<()>;

    /// User ids that have a credit state row; the expiration sweep walks these.
    async fn list_user_ids_with_credit_state(&self) -> DbResult<Vec<Uuid>>;

    async fn set_credit_bypassed(&self, user_id: Uuid, bypassed: bool) -> DbResult<()>;

    /// Record the one-time extension: new expiration plus the extension time.
    async fn record_credit_extension(
        &self,
        user_id: Uuid,
        new_expiration: DateTime<Utc>,
        extension_time: DateTime<Utc>,
    ) -> DbResult<()>;

    async fn record_expiration_warning_sent(
        &self,
        user_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> DbResult<()>;

    async fn record_expiration_cleanup(
        &self,
        user_id: Uuid,
        cleaned_at: DateTime<Utc>,
    ) -> DbResult<()>;
}
