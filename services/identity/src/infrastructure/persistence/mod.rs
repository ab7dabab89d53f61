//! 存储实现
//!
//! - `memory`: 进程内存储，未配置数据库时使用，也用于测试
//! - `postgres`: PostgreSQL 存储与迁移

pub mod memory;
pub mod postgres;
