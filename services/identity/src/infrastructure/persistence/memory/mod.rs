//! 进程内存储
//!
//! 全部状态位于一把 `tokio::sync::Mutex` 之后。工作单元在开始时取得锁并在
//! 副本上修改，提交时整体写回，丢弃时直接放弃副本，因此工作单元之间完全串行。

mod repositories;
mod state;
mod unit_of_work;

pub use repositories::{MemoryUserRepository, MemoryVerificationTokenRepository};
pub use unit_of_work::MemoryUnitOfWork;

use std::sync::Arc;

use agora_common::UserId;
use agora_errors::AppResult;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::repositories::{UserRepository, VerificationTokenRepository};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::user::VerificationToken;
use repositories::Handle;
use state::MemoryState;

/// 进程内存储
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(MemoryUserRepository::new(Handle::Shared(self.state.clone())))
    }

    pub fn verification_tokens(&self) -> Arc<dyn VerificationTokenRepository> {
        Arc::new(MemoryVerificationTokenRepository::new(Handle::Shared(
            self.state.clone(),
        )))
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// 用户名下的全部令牌（含已使用）
    pub async fn tokens_for_user(&self, user_id: &UserId) -> Vec<VerificationToken> {
        self.state
            .lock()
            .await
            .tokens
            .values()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UnitOfWorkFactory for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork::new(guard)))
    }
}
