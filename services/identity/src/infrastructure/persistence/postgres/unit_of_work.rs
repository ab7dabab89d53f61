//! PostgreSQL Unit of Work 实现
//!
//! 使用 SQLx Transaction 提供事务协调能力。未提交即被丢弃时，
//! SQLx 会在连接归还前回滚事务。

use std::sync::Arc;

use agora_errors::{AppError, AppResult};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use super::tx_repositories::{SharedTx, TxUserRepository, TxVerificationTokenRepository};
use crate::domain::repositories::{UserRepository, VerificationTokenRepository};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// PostgreSQL Unit of Work 工厂
pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }
}

/// PostgreSQL Unit of Work 实现
///
/// 所有 Repository 操作都在同一个事务中执行。
pub struct PostgresUnitOfWork {
    tx: SharedTx,
    user_repo: TxUserRepository,
    verification_token_repo: TxVerificationTokenRepository,
}

impl PostgresUnitOfWork {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx: SharedTx = Arc::new(Mutex::new(Some(tx)));

        Self {
            tx: tx.clone(),
            user_repo: TxUserRepository::new(tx.clone()),
            verification_token_repo: TxVerificationTokenRepository::new(tx),
        }
    }

    async fn take(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn users(&self) -> &dyn UserRepository {
        &self.user_repo
    }

    fn verification_tokens(&self) -> &dyn VerificationTokenRepository {
        &self.verification_token_repo
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.take()
            .await?
            .commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.take()
            .await?
            .rollback()
            .await
            .map_err(|e| AppError::database(format!("Failed to rollback transaction: {}", e)))
    }
}
