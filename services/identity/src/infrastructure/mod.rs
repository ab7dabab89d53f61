//! 基础设施层

pub mod cleanup;
pub mod notification;
pub mod persistence;
