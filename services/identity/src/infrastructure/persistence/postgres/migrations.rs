//! 身份服务的数据库迁移

use agora_adapter_postgres::{Migration, MigrationManager, MigrationReport};
use agora_errors::AppResult;
use sqlx::PgPool;

/// 按版本排列的迁移
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "create_users",
            include_str!("../../../../migrations/0001_create_users.sql"),
        ),
        Migration::new(
            2,
            "create_verification_tokens",
            include_str!("../../../../migrations/0002_create_verification_tokens.sql"),
        ),
    ]
}

/// 应用全部待执行迁移
pub async fn run_migrations(pool: &PgPool) -> AppResult<MigrationReport> {
    MigrationManager::new(pool.clone())
        .migrate(&migrations())
        .await
}
