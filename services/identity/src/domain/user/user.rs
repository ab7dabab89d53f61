//! 用户实体

use agora_auth_core::HashedPassword;
use agora_common::UserId;
use chrono::{DateTime, Utc};

use crate::domain::value_objects::{Email, Username};

/// 用户实体
///
/// 注册时创建为未启用状态，激活成功后启用且不再回退。
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: Email,
    pub password_hash: HashedPassword,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub enabled_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: Username, email: Email, password_hash: HashedPassword) -> Self {
        Self {
            id: UserId::new(),
            username,
            email,
            password_hash,
            enabled: false,
            created_at: Utc::now(),
            enabled_at: None,
        }
    }

    /// 启用账户
    ///
    /// 返回本次调用是否发生了状态转换；已启用时不修改 `enabled_at`。
    pub fn enable(&mut self, at: DateTime<Utc>) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        self.enabled_at = Some(at);
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
