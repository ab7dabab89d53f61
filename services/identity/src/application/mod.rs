//! 应用层

mod auth_service;
mod dto;

pub use auth_service::*;
pub use dto::*;
