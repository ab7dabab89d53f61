//! API 路由

use agora_adapter_postgres::check_connection;
use agora_identity::application::AuthenticatedUser;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::middleware::{CurrentUser, auth_middleware};
use crate::state::AppState;

/// 探针，不需要认证
pub fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}

/// 指标路由，只挂在独立的 metrics 端口上
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(handle)
}

/// 需要会话令牌的路由
pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(current_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<ServiceCheck>,
}

#[derive(Debug, Serialize)]
pub struct ServiceCheck {
    pub name: String,
    pub healthy: bool,
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks = Vec::new();

    if let Some(pool) = &state.pool {
        checks.push(ServiceCheck {
            name: "postgres".to_string(),
            healthy: check_connection(pool).await.is_ok(),
        });
    }

    let ready = checks.iter().all(|c| c.healthy);
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(ReadinessResponse { ready, checks }))
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}

async fn current_user(CurrentUser(user): CurrentUser) -> Json<AuthenticatedUser> {
    Json(user)
}
