//! 路由共享状态

use std::sync::Arc;

use agora_identity::application::AuthService;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    /// 使用进程内存储时为 None
    pub pool: Option<PgPool>,
}

impl AppState {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            pool: None,
        }
    }

    pub fn with_pool(mut self, pool: PgPool) -> Self {
        self.pool = Some(pool);
        self
    }
}
