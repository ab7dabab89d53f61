//! 数据库行与实体之间的转换

use agora_auth_core::HashedPassword;
use agora_common::UserId;
use agora_errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::user::{User, VerificationToken};
use crate::domain::value_objects::{Email, Username};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    enabled: bool,
    created_at: DateTime<Utc>,
    enabled_at: Option<DateTime<Utc>>,
}

impl UserRow {
    pub(super) fn into_user(self) -> AppResult<User> {
        let username = Username::new(self.username)
            .map_err(|e| AppError::database(format!("Corrupt username in users row: {}", e)))?;
        let email = Email::new(self.email)
            .map_err(|e| AppError::database(format!("Corrupt email in users row: {}", e)))?;

        Ok(User {
            id: UserId::from_uuid(self.id),
            username,
            email,
            password_hash: HashedPassword::from_hash(self.password_hash),
            enabled: self.enabled,
            created_at: self.created_at,
            enabled_at: self.enabled_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct VerificationTokenRow {
    token: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl From<VerificationTokenRow> for VerificationToken {
    fn from(row: VerificationTokenRow) -> Self {
        Self {
            token: row.token,
            user_id: UserId::from_uuid(row.user_id),
            created_at: row.created_at,
            expires_at: row.expires_at,
            consumed_at: row.consumed_at,
        }
    }
}
