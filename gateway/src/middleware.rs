//! 中间件

use agora_errors::AppError;
use agora_identity::application::AuthenticatedUser;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// 当前调用方
///
/// 只能用在 auth_middleware 之后的路由上。
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                warn!("Authenticated user missing from request extensions");
                ApiError(AppError::unauthenticated("missing session"))
            })
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 会话令牌认证中间件
///
/// 校验 `Authorization: Bearer <token>` 并把调用方身份放入请求扩展。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&request) else {
        warn!(path = %request.uri().path(), "Missing or invalid authorization header");
        return Err(ApiError(AppError::unauthenticated("missing bearer token")));
    };

    let user = state.auth.authenticate(token)?;
    debug!(username = %user.username, "Session token validated");

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
