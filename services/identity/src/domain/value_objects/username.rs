//! Username 值对象

use agora_errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 32;

/// Username 值对象
///
/// 3-32 个 ASCII 字母、数字、下划线或连字符，以字母或数字开头。区分大小写。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn new(username: impl Into<String>) -> Result<Self, UsernameError> {
        let username = username.into();
        Self::validate(&username)?;
        Ok(Self(username))
    }

    fn validate(username: &str) -> Result<(), UsernameError> {
        if username.trim().is_empty() {
            return Err(UsernameError::Empty);
        }

        // 只允许 ASCII，len() 即字符数
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(UsernameError::InvalidCharacters);
        }

        if username.len() < USERNAME_MIN_LEN {
            return Err(UsernameError::TooShort);
        }

        if username.len() > USERNAME_MAX_LEN {
            return Err(UsernameError::TooLong);
        }

        if !username.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(UsernameError::InvalidStart);
        }

        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

/// Username 错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("Username must not be empty")]
    Empty,

    #[error("Username is too short (minimum 3 characters)")]
    TooShort,

    #[error("Username is too long (maximum 32 characters)")]
    TooLong,

    #[error(
        "Username contains invalid characters (only letters, digits, underscore and hyphen allowed)"
    )]
    InvalidCharacters,

    #[error("Username must start with a letter or digit")]
    InvalidStart,
}

impl From<UsernameError> for AppError {
    fn from(err: UsernameError) -> Self {
        AppError::validation(err.to_string())
    }
}
