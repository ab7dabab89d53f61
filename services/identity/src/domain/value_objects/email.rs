//! Email 值对象

use agora_errors::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Email 值对象
///
/// 使用 `email_address` crate 做 RFC 5322 校验，存储为小写，
/// 因此唯一性比较不区分大小写。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> Result<Self, EmailError> {
        let email = email.into();
        let email = email.trim();

        if email.is_empty() {
            return Err(EmailError::Empty);
        }

        if !email_address::EmailAddress::is_valid(email) {
            return Err(EmailError::InvalidFormat(email.to_string()));
        }

        Ok(Self(email.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Email 错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("Email must not be empty")]
    Empty,

    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(Email::new("user@example.com").is_ok());
        assert!(Email::new("user.name@example.com").is_ok());
        assert!(Email::new("user+tag@example.co.uk").is_ok());
        assert!(Email::new("user_name@example-domain.com").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert_eq!(Email::new("").unwrap_err(), EmailError::Empty);
        assert!(Email::new("user@@example.com").is_err());
        assert!(Email::new("userexample.com").is_err());
        assert!(Email::new("@example.com").is_err());
        assert!(Email::new("user@").is_err());
        assert!(Email::new("user name@example.com").is_err());
    }

    #[test]
    fn test_email_normalized() {
        let email = Email::new("  User@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "user@example.com");
    }
}
