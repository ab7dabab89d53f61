//! 认证路由

use agora_errors::AppError;
use agora_identity::application::LoginResult;
use axum::{
    Router,
    extract::{Json, Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route(
            "/api/auth/accountVerification/{token}",
            get(verify_account),
        )
        .route("/api/auth/login", post(login))
        .route("/api/auth/resendVerification", post(resend_verification))
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    pub verification_email_sent: bool,
}

/// 注册
///
/// 账户已创建但激活通知未能受理时返回 202。
async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let Json(req) = body?;

    match state
        .auth
        .signup(&req.username, &req.email, &req.password)
        .await
    {
        Ok(()) => Ok((
            StatusCode::OK,
            Json(SignupResponse {
                message: "User registration successful".to_string(),
                verification_email_sent: true,
            }),
        )),
        Err(AppError::Delivery(_)) => Ok((
            StatusCode::ACCEPTED,
            Json(SignupResponse {
                message: "User registered, verification email could not be sent".to_string(),
                verification_email_sent: false,
            }),
        )),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn verify_account(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.auth.verify_account(&token).await?;

    Ok(Json(MessageResponse {
        message: "Account activated successfully".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResult>> {
    let Json(req) = body?;
    let result = state.auth.login(&req.username, &req.password).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// 重新发送激活邮件
///
/// 邮箱是否注册对调用方不可见，统一返回 202，通知未能受理时也一样。
async fn resend_verification(
    State(state): State<AppState>,
    body: Result<Json<ResendVerificationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(req) = body?;
    match state.auth.resend_verification(&req.email).await {
        Ok(()) | Err(AppError::Delivery(_)) => {}
        Err(e) => return Err(e.into()),
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "If the account exists and is not yet active, a new verification email has been sent".to_string(),
        }),
    ))
}
