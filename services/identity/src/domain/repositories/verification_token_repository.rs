//! 激活令牌 Repository trait

use agora_common::UserId;
use agora_errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::user::VerificationToken;

#[async_trait]
pub trait VerificationTokenRepository: Send + Sync {
    async fn save(&self, token: &VerificationToken) -> AppResult<()>;

    async fn find_by_token(&self, token: &str) -> AppResult<Option<VerificationToken>>;

    /// 标记为已使用
    ///
    /// 仅当令牌存在且尚未使用时成功并返回 true；并发调用中只有一个会返回 true。
    async fn mark_consumed(&self, token: &str, at: DateTime<Utc>) -> AppResult<bool>;

    /// 删除用户所有未使用的令牌，返回删除数量
    async fn delete_unconsumed_for_user(&self, user_id: &UserId) -> AppResult<u64>;

    /// 删除 `now` 之前过期的令牌，返回删除数量
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
