//! Unit of Work 模式
//!
//! 凭据存储与激活令牌存储在同一事务中协调，写入要么一起提交，要么都不生效。

use agora_errors::AppResult;
use async_trait::async_trait;

use crate::domain::repositories::{UserRepository, VerificationTokenRepository};

/// Unit of Work trait
///
/// ```ignore
/// let uow = uow_factory.begin().await?;
/// uow.users().save(&user).await?;
/// uow.verification_tokens().save(&token).await?;
/// uow.commit().await?;
/// ```
///
/// 未提交即被丢弃的工作单元视为回滚。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> &dyn UserRepository;

    fn verification_tokens(&self) -> &dyn VerificationTokenRepository;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// 开始新的事务
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
