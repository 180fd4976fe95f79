use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_uuid, placeholders};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UserRepo,
    },
    models::{CreateUser, User, UserCreditState},
};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn user_from_row(row: &SqliteRow) -> DbResult<User> {
        Ok(User {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            email: row.get("email"),
            name: row.get("name"),
            credit_limit_override: row.get("credit_limit_override"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn credit_state_from_row(row: &SqliteRow) -> DbResult<UserCreditState> {
        Ok(UserCreditState {
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            credit_start_time: row.get("credit_start_time"),
            expiration_time: row.get("expiration_time"),
            extension_time: row.get("extension_time"),
            warning_sent_time: row.get("warning_sent_time"),
            cleanup_time: row.get("cleanup_time"),
            bypassed: row.get("bypassed"),
        })
    }
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create(&self, user: CreateUser) -> DbResult<User> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, credit_limit_override, created_at, updated_at)
            VALUES (?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DbError::Conflict(format!("User with email {} already exists", user.email))
            }
            other => DbError::Sqlx(other),
        })?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::Internal("User missing after insert".into()))
    }

    async fn get(&self, id: Uuid) -> DbResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, name, credit_limit_override, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> DbResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            r#"
            SELECT id, email, name, credit_limit_override, created_at, updated_at
            FROM users
            WHERE id IN ({})
            ORDER BY created_at, id
            "#,
            placeholders(ids.len())
        );

        let mut q = sqlx::query(&query);
        for id in ids {
            q = q.bind(id.to_string());
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.iter().map(Self::user_from_row).collect()
    }

    async fn list_user_ids(&self) -> DbResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM users ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| parse_uuid(&row.get::<String, _>("id")))
            .collect()
    }

    async fn set_credit_limit_override(&self, id: Uuid, limit: Option<f64>) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE users SET credit_limit_override = ?, updated_at = ? WHERE id = ?")
                .bind(limit)
                .bind(Utc::now())
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn get_credit_state(&self, user_id: Uuid) -> DbResult<Option<UserCreditState>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, credit_start_time, expiration_time, extension_time,
                   warning_sent_time, cleanup_time, bypassed
            FROM user_credit_expirations
            WHERE user_id = ?
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::credit_state_from_row).transpose()
    }

    async fn find_credit_states(&self, user_ids: &[Uuid]) -> DbResult<Vec<UserCreditState>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            r#"
            SELECT user_id, credit_start_time, expiration_time, extension_time,
                   warning_sent_time, cleanup_time, bypassed
            FROM user_credit_expirations
            WHERE user_id IN ({})
            ORDER BY user_id
            "#,
            placeholders(user_ids.len())
        );

        let mut q = sqlx::query(&query);
        for id in user_ids {
            q = q.bind(id.to_string());
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.iter().map(Self::credit_state_from_row).collect()
    }

    async fn create_credit_state(&self, state: &UserCreditState) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_credit_expirations
                (user_id, credit_start_time, expiration_time, extension_time,
                 warning_sent_time, cleanup_time, bypassed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(state.user_id.to_string())
        .bind(state.credit_start_time)
        .bind(state.expiration_time)
        .bind(state.extension_time)
        .bind(state.warning_sent_time)
        .bind(state.cleanup_time)
        .bind(state.bypassed)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DbError::Conflict(
                format!("Credit state already exists for user {}", state.user_id),
            ),
            other => DbError::Sqlx(other),
        })?;

        Ok(())
    }

    async fn list_user_ids_with_credit_state(&self) -> DbResult<Vec<Uuid>> {
        let rows = sqlx::query("SELECT user_id FROM user_credit_expirations ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| parse_uuid(&row.get::<String, _>("user_id")))
            .collect()
    }

    async fn set_credit_bypassed(&self, user_id: Uuid, bypassed: bool) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE user_credit_expirations SET bypassed = ? WHERE user_id = ?")
                .bind(bypassed)
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn record_credit_extension(
        &self,
        user_id: Uuid,
        new_expiration: DateTime<Utc>,
        extension_time: DateTime<Utc>,
    ) -> DbResult<()> {
        // Guard against a double extension racing past the service-level check.
        let result = sqlx::query(
            r#"
            UPDATE user_credit_expirations
            SET expiration_time = ?, extension_time = ?
            WHERE user_id = ? AND extension_time IS NULL
            "#,
        )
        .bind(new_expiration)
        .bind(extension_time)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "Credit extension already recorded for user {}",
                user_id
            )));
        }
        Ok(())
    }

    async fn record_expiration_warning_sent(
        &self,
        user_id: Uuid,
        sent_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE user_credit_expirations SET warning_sent_time = ? WHERE user_id = ?")
                .bind(sent_at)
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn record_expiration_cleanup(
        &self,
        user_id: Uuid,
        cleaned_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE user_credit_expirations SET cleanup_time = ? WHERE user_id = ?")
                .bind(cleaned_at)
                .bind(user_id.to_string())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
