//! 仓储接口

mod user_repository;
mod verification_token_repository;

pub use user_repository::*;
pub use verification_token_repository::*;
