//! 事务感知的 Repository 实现
//!
//! 这些 Repository 使用共享的 Transaction 而非 PgPool。

use std::sync::Arc;

use agora_common::UserId;
use agora_errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;

use super::sql;
use crate::domain::repositories::{UserRepository, VerificationTokenRepository};
use crate::domain::user::{User, VerificationToken};
use crate::domain::value_objects::{Email, Username};

/// 共享事务类型
pub(super) type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// 宏：定义一个持有共享事务的 TxRepository 结构体
macro_rules! define_tx_repo {
    ($name:ident) => {
        pub struct $name {
            tx: SharedTx,
        }

        impl $name {
            pub(super) fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

define_tx_repo!(TxUserRepository);
define_tx_repo!(TxVerificationTokenRepository);

#[async_trait]
impl UserRepository for TxUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::find_user_by_id(&mut **tx, id).await
    }

    async fn find_by_username(&self, username: &Username) -> AppResult<Option<User>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::find_user_by_username(&mut **tx, username.as_str()).await
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::find_user_by_email(&mut **tx, email.as_str()).await
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::insert_user(&mut **tx, user).await
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::update_user(&mut **tx, user).await
    }
}

#[async_trait]
impl VerificationTokenRepository for TxVerificationTokenRepository {
    async fn save(&self, token: &VerificationToken) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::insert_token(&mut **tx, token).await
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<VerificationToken>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::find_token(&mut **tx, token).await
    }

    async fn mark_consumed(&self, token: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::mark_token_consumed(&mut **tx, token, at).await
    }

    async fn delete_unconsumed_for_user(&self, user_id: &UserId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::delete_unconsumed_tokens(&mut **tx, user_id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        sql::delete_expired_tokens(&mut **tx, now).await
    }
}
