//! 进程内 Repository 实现

use std::sync::Arc;

use agora_common::UserId;
use agora_errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::state::MemoryState;
use crate::domain::repositories::{UserRepository, VerificationTokenRepository};
use crate::domain::user::{User, VerificationToken};
use crate::domain::value_objects::{Email, Username};

/// 工作单元内的暂存状态
pub(crate) struct Staged {
    /// 持有全局锁直到提交或丢弃
    pub(crate) guard: OwnedMutexGuard<MemoryState>,
    pub(crate) state: MemoryState,
}

pub(crate) type SharedStaged = Arc<Mutex<Option<Staged>>>;

/// Repository 访问的状态来源
#[derive(Clone)]
pub(crate) enum Handle {
    /// 直接读写共享状态，每次调用单独加锁
    Shared(Arc<Mutex<MemoryState>>),
    /// 读写工作单元的暂存副本
    Staged(SharedStaged),
}

impl Handle {
    async fn with<R, F>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut MemoryState) -> R + Send,
    {
        match self {
            Handle::Shared(state) => Ok(f(&mut *state.lock().await)),
            Handle::Staged(staged) => {
                let mut guard = staged.lock().await;
                let staged = guard
                    .as_mut()
                    .ok_or_else(|| AppError::internal("Transaction consumed"))?;
                Ok(f(&mut staged.state))
            }
        }
    }
}

pub struct MemoryUserRepository {
    handle: Handle,
}

impl MemoryUserRepository {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        self.handle.with(|s| s.users.get(id).cloned()).await
    }

    async fn find_by_username(&self, username: &Username) -> AppResult<Option<User>> {
        self.handle
            .with(|s| s.find_user(|u| &u.username == username))
            .await
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        self.handle.with(|s| s.find_user(|u| &u.email == email)).await
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        self.handle.with(|s| s.insert_user(user)).await?
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        self.handle.with(|s| s.update_user(user)).await?
    }
}

pub struct MemoryVerificationTokenRepository {
    handle: Handle,
}

impl MemoryVerificationTokenRepository {
    pub(crate) fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl VerificationTokenRepository for MemoryVerificationTokenRepository {
    async fn save(&self, token: &VerificationToken) -> AppResult<()> {
        self.handle.with(|s| s.insert_token(token)).await?
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<VerificationToken>> {
        self.handle.with(|s| s.tokens.get(token).cloned()).await
    }

    async fn mark_consumed(&self, token: &str, at: DateTime<Utc>) -> AppResult<bool> {
        self.handle.with(|s| s.mark_consumed(token, at)).await
    }

    async fn delete_unconsumed_for_user(&self, user_id: &UserId) -> AppResult<u64> {
        self.handle
            .with(|s| s.delete_unconsumed_for_user(user_id))
            .await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.handle.with(|s| s.delete_expired(now)).await
    }
}
