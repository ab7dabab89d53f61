//! 口令哈希
//!
//! 哈希串为 PHC 格式，自带算法、参数和盐，校验时无需额外信息。

use agora_errors::{AppError, AppResult};
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// 哈希后的密码
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// 从已有的哈希字符串创建
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword([REDACTED])")
    }
}

impl fmt::Display for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// 口令哈希器
///
/// 每次 `hash` 使用新盐，同一口令两次哈希结果不同。
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> AppResult<HashedPassword>;

    /// 哈希串无法解析时返回 false
    fn verify(&self, plain: &str, hashed: &HashedPassword) -> bool;
}

/// Argon2id 实现
#[derive(Clone, Default)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 自定义代价参数（内存 KiB、迭代次数、并行度）
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> AppResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| AppError::internal(format!("Invalid argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plain: &str) -> AppResult<HashedPassword> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {}", e)))?
            .to_string();

        Ok(HashedPassword(hash))
    }

    fn verify(&self, plain: &str, hashed: &HashedPassword) -> bool {
        let parsed = match PasswordHash::new(hashed.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(error = %e, "Stored password hash is not a valid PHC string");
                return false;
            }
        };

        self.argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}
