//! agora-auth-core - 认证核心库
//!
//! 会话令牌签发/校验（JWT HS256）与口令哈希（Argon2id）

mod password;
mod token;

pub use password::*;
pub use token::*;
