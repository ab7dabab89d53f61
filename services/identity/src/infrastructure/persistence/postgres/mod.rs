//! PostgreSQL 存储

mod migrations;
mod repositories;
mod rows;
mod sql;
mod tx_repositories;
mod unit_of_work;

pub use migrations::*;
pub use repositories::*;
pub use unit_of_work::*;
