//! 用户 Repository trait

use agora_common::UserId;
use agora_errors::AppResult;
use async_trait::async_trait;

use crate::domain::user::User;
use crate::domain::value_objects::{Email, Username};

/// 凭据存储
///
/// 用户名与邮箱各自唯一；`save` 遇到重复时返回 `AppError::Conflict`。
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>>;

    async fn find_by_username(&self, username: &Username) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>>;

    /// 插入新用户
    async fn save(&self, user: &User) -> AppResult<()>;

    /// 更新已有用户，不存在时返回 `AppError::NotFound`
    async fn update(&self, user: &User) -> AppResult<()>;
}
