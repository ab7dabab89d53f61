//! 基于连接池的 Repository 实现

use agora_common::UserId;
use agora_errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::sql;
use crate::domain::repositories::{UserRepository, VerificationTokenRepository};
use crate::domain::user::{User, VerificationToken};
use crate::domain::value_objects::{Email, Username};

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        sql::find_user_by_id(&self.pool, id).await
    }

    async fn find_by_username(&self, username: &Username) -> AppResult<Option<User>> {
        sql::find_user_by_username(&self.pool, username.as_str()).await
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        sql::find_user_by_email(&self.pool, email.as_str()).await
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        sql::insert_user(&self.pool, user).await
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        sql::update_user(&self.pool, user).await
    }
}

pub struct PostgresVerificationTokenRepository {
    pool: PgPool,
}

impl PostgresVerificationTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationTokenRepository for PostgresVerificationTokenRepository {
    async fn save(&self, token: &VerificationToken) -> AppResult<()> {
        sql::insert_token(&self.pool, token).await
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<VerificationToken>> {
        sql::find_token(&self.pool, token).await
    }

    async fn mark_consumed(&self, token: &str, at: DateTime<Utc>) -> AppResult<bool> {
        sql::mark_token_consumed(&self.pool, token, at).await
    }

    async fn delete_unconsumed_for_user(&self, user_id: &UserId) -> AppResult<u64> {
        sql::delete_unconsumed_tokens(&self.pool, user_id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        sql::delete_expired_tokens(&self.pool, now).await
    }
}
