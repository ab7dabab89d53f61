//! 进程内 Unit of Work

use std::sync::Arc;

use agora_errors::{AppError, AppResult};
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repositories::{
    Handle, MemoryUserRepository, MemoryVerificationTokenRepository, SharedStaged, Staged,
};
use super::state::MemoryState;
use crate::domain::repositories::{UserRepository, VerificationTokenRepository};
use crate::domain::unit_of_work::UnitOfWork;

pub struct MemoryUnitOfWork {
    staged: SharedStaged,
    user_repo: MemoryUserRepository,
    verification_token_repo: MemoryVerificationTokenRepository,
}

impl MemoryUnitOfWork {
    pub(crate) fn new(guard: OwnedMutexGuard<MemoryState>) -> Self {
        let state = (*guard).clone();
        let staged: SharedStaged = Arc::new(Mutex::new(Some(Staged { guard, state })));

        Self {
            staged: staged.clone(),
            user_repo: MemoryUserRepository::new(Handle::Staged(staged.clone())),
            verification_token_repo: MemoryVerificationTokenRepository::new(Handle::Staged(
                staged,
            )),
        }
    }

    async fn take(&self) -> AppResult<Staged> {
        self.staged
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn users(&self) -> &dyn UserRepository {
        &self.user_repo
    }

    fn verification_tokens(&self) -> &dyn VerificationTokenRepository {
        &self.verification_token_repo
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Staged { mut guard, state } = self.take().await?;
        *guard = state;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        // 丢弃副本并释放锁
        self.take().await?;
        Ok(())
    }
}
