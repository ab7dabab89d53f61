//! SQL 语句
//!
//! 对 `Executor` 泛型，连接池与事务共用同一份语句。

use agora_adapter_postgres::map_sqlx_error;
use agora_common::UserId;
use agora_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use super::rows::{UserRow, VerificationTokenRow};
use crate::domain::user::{User, VerificationToken};

macro_rules! select_user {
    ($filter:literal) => {
        concat!(
            "SELECT id, username, email, password_hash, enabled, created_at, enabled_at ",
            "FROM users WHERE ",
            $filter
        )
    };
}

async fn fetch_user<'e, E>(executor: E, sql: &'static str, value: UserKey<'_>) -> AppResult<Option<User>>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = sqlx::query_as::<_, UserRow>(sql);
    let query = match value {
        UserKey::Id(id) => query.bind(id.0),
        UserKey::Text(text) => query.bind(text.to_owned()),
    };

    query
        .fetch_optional(executor)
        .await
        .map_err(map_sqlx_error)?
        .map(UserRow::into_user)
        .transpose()
}

enum UserKey<'a> {
    Id(&'a UserId),
    Text(&'a str),
}

pub(super) async fn find_user_by_id<'e, E>(executor: E, id: &UserId) -> AppResult<Option<User>>
where
    E: Executor<'e, Database = Postgres>,
{
    fetch_user(executor, select_user!("id = $1"), UserKey::Id(id)).await
}

pub(super) async fn find_user_by_username<'e, E>(
    executor: E,
    username: &str,
) -> AppResult<Option<User>>
where
    E: Executor<'e, Database = Postgres>,
{
    fetch_user(executor, select_user!("username = $1"), UserKey::Text(username)).await
}

pub(super) async fn find_user_by_email<'e, E>(executor: E, email: &str) -> AppResult<Option<User>>
where
    E: Executor<'e, Database = Postgres>,
{
    fetch_user(executor, select_user!("email = $1"), UserKey::Text(email)).await
}

pub(super) async fn insert_user<'e, E>(executor: E, user: &User) -> AppResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, enabled, created_at, enabled_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user.id.0)
    .bind(user.username.as_str())
    .bind(user.email.as_str())
    .bind(user.password_hash.as_str())
    .bind(user.enabled)
    .bind(user.created_at)
    .bind(user.enabled_at)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

pub(super) async fn update_user<'e, E>(executor: E, user: &User) -> AppResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET username = $2, email = $3, password_hash = $4, enabled = $5, enabled_at = $6
        WHERE id = $1
        "#,
    )
    .bind(user.id.0)
    .bind(user.username.as_str())
    .bind(user.email.as_str())
    .bind(user.password_hash.as_str())
    .bind(user.enabled)
    .bind(user.enabled_at)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    Ok(())
}

pub(super) async fn insert_token<'e, E>(executor: E, token: &VerificationToken) -> AppResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO verification_tokens (token, user_id, created_at, expires_at, consumed_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&token.token)
    .bind(token.user_id.0)
    .bind(token.created_at)
    .bind(token.expires_at)
    .bind(token.consumed_at)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(())
}

pub(super) async fn find_token<'e, E>(
    executor: E,
    token: &str,
) -> AppResult<Option<VerificationToken>>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, VerificationTokenRow>(
        r#"
        SELECT token, user_id, created_at, expires_at, consumed_at
        FROM verification_tokens
        WHERE token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(row.map(Into::into))
}

pub(super) async fn mark_token_consumed<'e, E>(
    executor: E,
    token: &str,
    at: DateTime<Utc>,
) -> AppResult<bool>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        "UPDATE verification_tokens SET consumed_at = $2 WHERE token = $1 AND consumed_at IS NULL",
    )
    .bind(token)
    .bind(at)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected() == 1)
}

pub(super) async fn delete_unconsumed_tokens<'e, E>(executor: E, user_id: &UserId) -> AppResult<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        "DELETE FROM verification_tokens WHERE user_id = $1 AND consumed_at IS NULL",
    )
    .bind(user_id.0)
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_expired_tokens<'e, E>(executor: E, now: DateTime<Utc>) -> AppResult<u64>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at <= $1")
        .bind(now)
        .execute(executor)
        .await
        .map_err(map_sqlx_error)?;

    Ok(result.rows_affected())
}
