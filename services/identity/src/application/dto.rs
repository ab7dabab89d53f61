//! 认证服务的输出类型

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 登录结果
#[derive(Clone, Serialize)]
pub struct LoginResult {
    pub authentication_token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResult")
            .field("authentication_token", &"[REDACTED]")
            .field("username", &self.username)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 已认证的调用方身份
///
/// 由会话令牌校验得出，随请求显式传递给下游处理逻辑。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub session_expires_at: DateTime<Utc>,
}
