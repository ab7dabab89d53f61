//! 通知端口

use agora_errors::AppResult;
use chrono::{DateTime, Utc};

/// 账户激活通知
#[derive(Clone)]
pub struct VerificationNotice {
    pub username: String,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for VerificationNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationNotice")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// 通知发送端口
///
/// 只负责把通知交给后台发送，不等待投递结果。无法受理（队列已满或已关闭）
/// 时返回 `AppError::Delivery`。
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: VerificationNotice) -> AppResult<()>;
}
