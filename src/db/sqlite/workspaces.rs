use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_uuid, placeholders};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::WorkspaceRepo,
    },
    models::{
        BillingAccessStatus, CostUpdate, CreateWorkspace, Workspace, WorkspaceActiveStatus,
        WorkspaceCostRecord,
    },
};

pub struct SqliteWorkspaceRepo {
    pool: SqlitePool,
}

impl SqliteWorkspaceRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn workspace_from_row(row: &SqliteRow) -> DbResult<Workspace> {
        let active_status: String = row.get("active_status");
        let billing_access_status: String = row.get("billing_access_status");
        Ok(Workspace {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            namespace: row.get("namespace"),
            cloud_project: row.get("cloud_project"),
            creator_id: parse_uuid(&row.get::<String, _>("creator_id"))?,
            billing_account: row.get("billing_account"),
            active_status: WorkspaceActiveStatus::from_str(&active_status).ok_or_else(|| {
                DbError::Internal(format!("Invalid active_status: {}", active_status))
            })?,
            last_modified_time: row.get("last_modified_time"),
            billing_access_status: BillingAccessStatus::from_str(&billing_access_status)
                .ok_or_else(|| {
                    DbError::Internal(format!(
                        "Invalid billing_access_status: {}",
                        billing_access_status
                    ))
                })?,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl WorkspaceRepo for SqliteWorkspaceRepo {
    async fn create(&self, workspace: CreateWorkspace) -> DbResult<Workspace> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO workspaces
                (id, namespace, cloud_project, creator_id, billing_account,
                 active_status, last_modified_time, billing_access_status, created_at)
            VALUES (?, ?, ?, ?, ?, 'active', ?, 'active', ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&workspace.namespace)
        .bind(&workspace.cloud_project)
        .bind(workspace.creator_id.to_string())
        .bind(&workspace.billing_account)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| DbError::Internal("Workspace missing after insert".into()))
    }

    async fn get(&self, id: Uuid) -> DbResult<Option<Workspace>> {
        let row = sqlx::query(
            r#"
            SELECT id, namespace, cloud_project, creator_id, billing_account,
                   active_status, last_modified_time, billing_access_status, created_at
            FROM workspaces
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::workspace_from_row).transpose()
    }

    async fn mark_deleted(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE workspaces SET active_status = 'deleted', last_modified_time = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn get_cost_records(&self, creator_ids: &[Uuid]) -> DbResult<Vec<WorkspaceCostRecord>> {
        if creator_ids.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            r#"
            SELECT w.id, w.cloud_project, w.creator_id, w.billing_account,
                   w.active_status, w.last_modified_time, w.billing_access_status,
                   COALESCE(c.cost, 0.0) AS cached_cost,
                   c.last_update_time AS cached_cost_update_time
            FROM workspaces w
            LEFT JOIN workspace_cost_cache c ON c.workspace_id = w.id
            WHERE w.creator_id IN ({})
            ORDER BY w.created_at, w.id
            "#,
            placeholders(creator_ids.len())
        );

        let mut q = sqlx::query(&query);
        for id in creator_ids {
            q = q.bind(id.to_string());
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| {
                let active_status: String = row.get("active_status");
                let billing_access_status: String = row.get("billing_access_status");
                Ok(WorkspaceCostRecord {
                    workspace_id: parse_uuid(&row.get::<String, _>("id"))?,
                    cloud_project: row.get("cloud_project"),
                    creator_id: parse_uuid(&row.get::<String, _>("creator_id"))?,
                    billing_account: row.get("billing_account"),
                    cached_cost: row.get("cached_cost"),
                    cached_cost_update_time: row.get("cached_cost_update_time"),
                    active_status: WorkspaceActiveStatus::from_str(&active_status).ok_or_else(
                        || DbError::Internal(format!("Invalid active_status: {}", active_status)),
                    )?,
                    workspace_last_modified_time: row.get("last_modified_time"),
                    billing_access_status: BillingAccessStatus::from_str(&billing_access_status)
                        .ok_or_else(|| {
                            DbError::Internal(format!(
                                "Invalid billing_access_status: {}",
                                billing_access_status
                            ))
                        })?,
                })
            })
            .collect()
    }

    async fn upsert_costs(&self, changes: &[CostUpdate]) -> DbResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for change in changes {
            sqlx::query(
                r#"
                INSERT INTO workspace_cost_cache (workspace_id, cost, last_update_time)
                VALUES (?, ?, ?)
                ON CONFLICT(workspace_id) DO UPDATE SET
                    cost = excluded.cost,
                    last_update_time = excluded.last_update_time
                "#,
            )
            .bind(change.workspace_id.to_string())
            .bind(change.cost)
            .bind(change.update_time)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(changes.len())
    }

    async fn total_cached_cost_by_creator(&self, creator_id: Uuid) -> DbResult<Option<f64>> {
        let row = sqlx::query(
            r#"
            SELECT SUM(c.cost) AS total
            FROM workspace_cost_cache c
            INNER JOIN workspaces w ON w.id = c.workspace_id
            WHERE w.creator_id = ?
            "#,
        )
        .bind(creator_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<Option<f64>, _>("total"))
    }

    async fn find_by_creator(&self, creator_id: Uuid) -> DbResult<Vec<Workspace>> {
        let rows = sqlx::query(
            r#"
            SELECT id, namespace, cloud_project, creator_id, billing_account,
                   active_status, last_modified_time, billing_access_status, created_at
            FROM workspaces
            WHERE creator_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(creator_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::workspace_from_row).collect()
    }

    async fn set_billing_access_status(
        &self,
        workspace_id: Uuid,
        status: BillingAccessStatus,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE workspaces SET billing_access_status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(workspace_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn find_creators_with_active_billing_in(
        &self,
        creator_ids: &[Uuid],
        billing_accounts: &[String],
    ) -> DbResult<Vec<Uuid>> {
        if creator_ids.is_empty() || billing_accounts.is_empty() {
            return Ok(vec![]);
        }

        let query = format!(
            r#"
            SELECT DISTINCT creator_id
            FROM workspaces
            WHERE billing_access_status = 'active'
              AND creator_id IN ({})
              AND billing_account IN ({})
            "#,
            placeholders(creator_ids.len()),
            placeholders(billing_accounts.len())
        );

        let mut q = sqlx::query(&query);
        for id in creator_ids {
            q = q.bind(id.to_string());
        }
        for account in billing_accounts {
            q = q.bind(account);
        }
        let rows = q.fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| parse_uuid(&row.get::<String, _>("creator_id")))
            .collect()
    }
}
