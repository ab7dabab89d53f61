//! 账户激活令牌

use agora_common::{UserId, random_token};
use chrono::{DateTime, Duration, Utc};

/// 账户激活令牌
///
/// 一次性使用：`consumed_at` 只会被设置一次，过期后不可再用。
#[derive(Debug, Clone)]
pub struct VerificationToken {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl VerificationToken {
    /// 为用户签发新令牌（256 bit 随机数，十六进制）
    pub fn issue(user_id: UserId, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: random_token(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}
