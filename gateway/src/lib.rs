//! Agora API Gateway

pub mod auth;
pub mod error;
pub mod middleware;
pub mod routing;
pub mod state;

#[cfg(test)]
mod test_support;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use routing::metrics_router;
pub use state::AppState;

/// 构建完整路由
pub fn build_router(state: AppState) -> Router {
    auth::auth_routes()
        .merge(routing::protected_routes(state.clone()))
        .merge(routing::probe_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
