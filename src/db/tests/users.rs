//! Shared tests for UserRepo implementations

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{error::DbError, repos::UserRepo},
    models::{CreateUser, UserCreditState},
};

fn create_user_input(email: &str) -> CreateUser {
    CreateUser {
        email: email.to_string(),
        name: format!("User {}", email),
    }
}

fn credit_state_input(user_id: Uuid) -> UserCreditState {
    let now = Utc::now();
    UserCreditState {
        user_id,
        credit_start_time: now,
        expiration_time: Some(now + Duration::days(365)),
        extension_time: None,
        warning_sent_time: None,
        cleanup_time: None,
        bypassed: false,
    }
}

/// Test context containing the repo under test
pub struct UserTestContext<'a> {
    pub user_repo: &'a dyn UserRepo,
}

pub async fn test_create_user(ctx: &UserTestContext<'_>) {
    let user = ctx
        .user_repo
        .create(create_user_input("test@example.com"))
        .await
        .expect("Failed to create user");

    assert_eq!(user.email, "test@example.com");
    assert!(user.credit_limit_override.is_none());
    assert!(!user.id.is_nil());
}

pub async fn test_create_duplicate_email_fails(ctx: &UserTestContext<'_>) {
    ctx.user_repo
        .create(create_user_input("dup@example.com"))
        .await
        .expect("Failed to create user");

    let result = ctx
        .user_repo
        .create(create_user_input("dup@example.com"))
        .await;

    assert!(matches!(result, Err(DbError::Conflict(_))));
}

pub async fn test_get_not_found(ctx: &UserTestContext<'_>) {
    let result = ctx
        .user_repo
        .get(Uuid::new_v4())
        .await
        .expect("Query failed");
    assert!(result.is_none());
}

pub async fn test_find_by_ids_subset(ctx: &UserTestContext<'_>) {
    let a = ctx
        .user_repo
        .create(create_user_input("a@example.com"))
        .await
        .expect("create");
    let _b = ctx
        .user_repo
        .create(create_user_input("b@example.com"))
        .await
        .expect("create");

    let found = ctx
        .user_repo
        .find_by_ids(&[a.id, Uuid::new_v4()])
        .await
        .expect("query");

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, a.id);

    let none = ctx.user_repo.find_by_ids(&[]).await.expect("query");
    assert!(none.is_empty());
}

pub async fn test_list_user_ids(ctx: &UserTestContext<'_>) {
    assert!(ctx.user_repo.list_user_ids().await.expect("query").is_empty());

    let a = ctx
        .user_repo
        .create(create_user_input("a@example.com"))
        .await
        .expect("create");
    let b = ctx
        .user_repo
        .create(create_user_input("b@example.com"))
        .await
        .expect("create");

    let ids = ctx.user_repo.list_user_ids().await.expect("query");
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.id));
    assert!(ids.contains(&b.id));
}

pub async fn test_set_credit_limit_override(ctx: &UserTestContext<'_>) {
    let user = ctx
        .user_repo
        .create(create_user_input("limit@example.com"))
        .await
        .expect("create");

    ctx.user_repo
        .set_credit_limit_override(user.id, Some(500.0))
        .await
        .expect("set override");
    let user = ctx.user_repo.get(user.id).await.expect("get").unwrap();
    assert_eq!(user.credit_limit_override, Some(500.0));

    ctx.user_repo
        .set_credit_limit_override(user.id, None)
        .await
        .expect("clear override");
    let user = ctx.user_repo.get(user.id).await.expect("get").unwrap();
    assert!(user.credit_limit_override.is_none());
}

pub async fn test_set_credit_limit_override_missing_user(ctx: &UserTestContext<'_>) {
    let result = ctx
        .user_repo
        .set_credit_limit_override(Uuid::new_v4(), Some(500.0))
        .await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

pub async fn test_credit_state_roundtrip(ctx: &UserTestContext<'_>) {
    let user = ctx
        .user_repo
        .create(create_user_input("credit@example.com"))
        .await
        .expect("create");

    assert!(ctx
        .user_repo
        .get_credit_state(user.id)
        .await
        .expect("query")
        .is_none());

    let state = credit_state_input(user.id);
    ctx.user_repo
        .create_credit_state(&state)
        .await
        .expect("create state");

    let loaded = ctx
        .user_repo
        .get_credit_state(user.id)
        .await
        .expect("query")
        .expect("state missing");
    assert_eq!(loaded.user_id, user.id);
    assert_eq!(loaded.expiration_time, state.expiration_time);
    assert!(!loaded.bypassed);
    assert!(loaded.cleanup_time.is_none());
}

pub async fn test_create_credit_state_twice_conflicts(ctx: &UserTestContext<'_>) {
    let user = ctx
        .user_repo
        .create(create_user_input("twice@example.com"))
        .await
        .expect("create");

    let state = credit_state_input(user.id);
    ctx.user_repo
        .create_credit_state(&state)
        .await
        .expect("create state");

    let result = ctx.user_repo.create_credit_state(&state).await;
    assert!(matches!(result, Err(DbError::Conflict(_))));
}

pub async fn test_find_credit_states(ctx: &UserTestContext<'_>) {
    let a = ctx
        .user_repo
        .create(create_user_input("a@example.com"))
        .await
        .expect("create");
    let b = ctx
        .user_repo
        .create(create_user_input("b@example.com"))
        .await
        .expect("create");

    ctx.user_repo
        .create_credit_state(&credit_state_input(a.id))
        .await
        .expect("create state");

    let states = ctx
        .user_repo
        .find_credit_states(&[a.id, b.id])
        .await
        .expect("query");
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].user_id, a.id);

    let ids = ctx
        .user_repo
        .list_user_ids_with_credit_state()
        .await
        .expect("query");
    assert_eq!(ids, vec![a.id]);
}

pub async fn test_set_credit_bypassed(ctx: &UserTestContext<'_>) {
    let user = ctx
        .user_repo
        .create(create_user_input("bypass@example.com"))
        .await
        .expect("create");
    ctx.user_repo
        .create_credit_state(&credit_state_input(user.id))
        .await
        .expect("create state");

    ctx.user_repo
        .set_credit_bypassed(user.id, true)
        .await
        .expect("bypass");

    let state = ctx
        .user_repo
        .get_credit_state(user.id)
        .await
        .expect("query")
        .unwrap();
    assert!(state.bypassed);
    assert!(state.effective_expiration().is_none());
}

pub async fn test_record_credit_extension_only_once(ctx: &UserTestContext<'_>) {
    let user = ctx
        .user_repo
        .create(create_user_input("extend@example.com"))
        .await
        .expect("create");
    ctx.user_repo
        .create_credit_state(&credit_state_input(user.id))
        .await
        .expect("create state");

    let now = Utc::now();
    let new_expiration = now + Duration::days(730);
    ctx.user_repo
        .record_credit_extension(user.id, new_expiration, now)
        .await
        .expect("extend");

    let state = ctx
        .user_repo
        .get_credit_state(user.id)
        .await
        .expect("query")
        .unwrap();
    assert_eq!(state.expiration_time, Some(new_expiration));
    assert!(state.has_been_extended());

    // A second extension must not slip through.
    let result = ctx
        .user_repo
        .record_credit_extension(user.id, now + Duration::days(9999), now)
        .await;
    assert!(matches!(result, Err(DbError::Conflict(_))));
}

pub async fn test_record_warning_and_cleanup(ctx: &UserTestContext<'_>) {
    let user = ctx
        .user_repo
        .create(create_user_input("sweep@example.com"))
        .await
        .expect("create");
    ctx.user_repo
        .create_credit_state(&credit_state_input(user.id))
        .await
        .expect("create state");

    let warned_at = Utc::now();
    ctx.user_repo
        .record_expiration_warning_sent(user.id, warned_at)
        .await
        .expect("warning");

    let cleaned_at = warned_at + Duration::days(14);
    ctx.user_repo
        .record_expiration_cleanup(user.id, cleaned_at)
        .await
        .expect("cleanup");

    let state = ctx
        .user_repo
        .get_credit_state(user.id)
        .await
        .expect("query")
        .unwrap();
    assert_eq!(state.warning_sent_time, Some(warned_at));
    assert_eq!(state.cleanup_time, Some(cleaned_at));
}

// ============================================================================
// SQLite bindings
// ============================================================================

#[cfg(test)]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::SqliteUserRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repo() -> SqliteUserRepo {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        SqliteUserRepo::new(pool)
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let user_repo = create_repo().await;
                let ctx = UserTestContext {
                    user_repo: &user_repo,
                };
                super::$name(&ctx).await;
            }
        };
    }

    sqlite_test!(test_create_user);
    sqlite_test!(test_create_duplicate_email_fails);
    sqlite_test!(test_get_not_found);
    sqlite_test!(test_find_by_ids_subset);
    sqlite_test!(test_list_user_ids);
    sqlite_test!(test_set_credit_limit_override);
    sqlite_test!(test_set_credit_limit_override_missing_user);
    sqlite_test!(test_credit_state_roundtrip);
    sqlite_test!(test_create_credit_state_twice_conflicts);
    sqlite_test!(test_find_credit_states);
    sqlite_test!(test_set_credit_bypassed);
    sqlite_test!(test_record_credit_extension_only_once);
    sqlite_test!(test_record_warning_and_cleanup);
}
