//! 领域层

pub mod notification;
pub mod repositories;
pub mod unit_of_work;
pub mod user;
pub mod value_objects;
