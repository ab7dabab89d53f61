//! 明文口令策略

use agora_errors::AppError;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// 校验明文口令长度（按字符计）
///
/// 上限防止超长输入拖慢哈希。
pub fn validate_password(password: &str) -> Result<(), PasswordPolicyError> {
    let len = password.chars().count();

    if len < PASSWORD_MIN_LEN {
        return Err(PasswordPolicyError::TooShort(PASSWORD_MIN_LEN));
    }

    if len > PASSWORD_MAX_LEN {
        return Err(PasswordPolicyError::TooLong(PASSWORD_MAX_LEN));
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyError {
    #[error("Password is too short (minimum {0} characters)")]
    TooShort(usize),

    #[error("Password is too long (maximum {0} characters)")]
    TooLong(usize),
}

impl From<PasswordPolicyError> for AppError {
    fn from(err: PasswordPolicyError) -> Self {
        AppError::validation(err.to_string())
    }
}
