//! 认证服务
//!
//! 编排注册、账户激活、登录与会话校验。

use std::sync::Arc;

use agora_auth_core::{HashedPassword, PasswordHasher, TokenService};
use agora_errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::application::{AuthenticatedUser, LoginResult};
use crate::domain::notification::{Notifier, VerificationNotice};
use crate::domain::repositories::UserRepository;
use crate::domain::unit_of_work::UnitOfWorkFactory;
use crate::domain::user::{User, VerificationToken};
use crate::domain::value_objects::{Email, PASSWORD_MAX_LEN, Username, validate_password};

/// 未知用户登录时参与校验的口令，只用于让耗时与真实用户一致
const TIMING_DUMMY_PASSWORD: &str = "agora-timing-equalizer";

/// 登录失败统一返回的错误，不区分原因
fn invalid_credentials() -> AppError {
    AppError::unauthenticated("Invalid credentials")
}

/// 指标 outcome 标签
fn outcome<T>(result: &AppResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::Validation(_)) => "invalid",
        Err(AppError::Conflict(_)) => "conflict",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::Unauthenticated(_)) => "unauthenticated",
        Err(AppError::Delivery(_)) => "delivery_failed",
        Err(_) => "error",
    }
}

/// 认证服务依赖，在进程启动时装配一次
pub struct AuthDependencies {
    /// 事务外的只读查询
    pub users: Arc<dyn UserRepository>,
    pub uow_factory: Arc<dyn UnitOfWorkFactory>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub token_service: TokenService,
    pub notifier: Arc<dyn Notifier>,
}

/// 认证服务
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    hasher: Arc<dyn PasswordHasher>,
    token_service: TokenService,
    notifier: Arc<dyn Notifier>,
    verification_ttl: Duration,
    dummy_hash: HashedPassword,
}

impl AuthService {
    pub fn new(deps: AuthDependencies, verification_ttl: Duration) -> AppResult<Self> {
        let dummy_hash = deps.hasher.hash(TIMING_DUMMY_PASSWORD)?;

        Ok(Self {
            users: deps.users,
            uow_factory: deps.uow_factory,
            hasher: deps.hasher,
            token_service: deps.token_service,
            notifier: deps.notifier,
            verification_ttl,
            dummy_hash,
        })
    }

    /// 注册
    ///
    /// 用户与激活令牌在同一工作单元中提交，之后才把激活通知交给后台发送。
    /// 通知无法受理时返回 `AppError::Delivery`，此时账户已经创建。
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> AppResult<()> {
        debug!(username = %username, "Signup requested");

        let result = self.register(username, email, password).await;
        counter!("auth_signup_total", "outcome" => outcome(&result)).increment(1);
        result
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<()> {
        let username = Username::new(username)?;
        let email = Email::new(email)?;
        validate_password(password)?;

        let password_hash = self.hash_password(password).await?;
        let user = User::new(username, email, password_hash);
        let token = VerificationToken::issue(user.id.clone(), self.verification_ttl);

        let uow = self.uow_factory.begin().await?;
        uow.users().save(&user).await.inspect_err(|e| {
            warn!(username = %user.username, error = %e, "Signup rejected");
        })?;
        uow.verification_tokens().save(&token).await?;
        uow.commit().await?;

        info!(user_id = %user.id, username = %user.username, "User registered");

        self.send_verification(&user, &token)
    }

    /// 激活账户
    ///
    /// 查找、消费令牌与启用账户在同一工作单元中完成。令牌已使用返回 Conflict，
    /// 未知或已过期返回 NotFound，两种情况都不修改任何状态。
    pub async fn verify_account(&self, token: &str) -> AppResult<()> {
        let result = self.consume_verification(token).await;
        counter!("auth_verify_total", "outcome" => outcome(&result)).increment(1);
        result
    }

    async fn consume_verification(&self, token: &str) -> AppResult<()> {
        let now = Utc::now();
        let uow = self.uow_factory.begin().await?;

        let record = uow
            .verification_tokens()
            .find_by_token(token)
            .await?
            .ok_or_else(|| {
                warn!("Verification with unknown token");
                AppError::not_found("invalid token")
            })?;

        if record.is_consumed() {
            warn!(user_id = %record.user_id, "Verification token reused");
            return Err(AppError::conflict("token already used"));
        }

        if record.is_expired(now) {
            warn!(user_id = %record.user_id, expires_at = %record.expires_at, "Verification token expired");
            return Err(AppError::not_found("token expired"));
        }

        let mut user = uow
            .users()
            .find_by_id(&record.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        // 并发消费同一令牌时只有一个能成功
        if !uow.verification_tokens().mark_consumed(token, now).await? {
            warn!(user_id = %user.id, "Verification token consumed concurrently");
            return Err(AppError::conflict("token already used"));
        }

        if user.enable(now) {
            uow.users().update(&user).await?;
        }
        uow.commit().await?;

        info!(user_id = %user.id, username = %user.username, "Account enabled");
        Ok(())
    }

    /// 登录
    ///
    /// 用户不存在、未启用、口令错误统一返回 `Invalid credentials`。
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginResult> {
        let result = self.authenticate_credentials(username, password).await;
        counter!("auth_login_total", "outcome" => outcome(&result)).increment(1);
        result
    }

    async fn authenticate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<LoginResult> {
        if password.chars().count() > PASSWORD_MAX_LEN {
            warn!(username = %username, reason = "password_too_long", "Login rejected");
            return Err(invalid_credentials());
        }

        let candidate = match Username::new(username) {
            Ok(username) => self.users.find_by_username(&username).await?,
            Err(_) => None,
        };

        let hash = candidate
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());
        let password_matches = self.verify_password(password, hash).await?;

        let user = match candidate {
            Some(user) if password_matches && user.is_enabled() => user,
            Some(user) => {
                let reason = if password_matches { "disabled" } else { "bad_password" };
                warn!(user_id = %user.id, reason, "Login rejected");
                return Err(invalid_credentials());
            }
            None => {
                warn!(username = %username, reason = "unknown_user", "Login rejected");
                return Err(invalid_credentials());
            }
        };

        let issued = self.token_service.issue(user.username.as_str())?;

        info!(user_id = %user.id, username = %user.username, "User logged in");

        Ok(LoginResult {
            authentication_token: issued.token,
            username: user.username.to_string(),
            expires_at: issued.expires_at,
        })
    }

    /// 重新发送激活邮件
    ///
    /// 邮箱未注册或账户已启用时静默成功。旧的未使用令牌随之作废。
    pub async fn resend_verification(&self, email: &str) -> AppResult<()> {
        let email = Email::new(email)?;

        let Some(user) = self.users.find_by_email(&email).await? else {
            debug!("Resend requested for unknown email");
            return Ok(());
        };

        if user.is_enabled() {
            debug!(user_id = %user.id, "Resend requested for enabled account");
            return Ok(());
        }

        let token = VerificationToken::issue(user.id.clone(), self.verification_ttl);

        let uow = self.uow_factory.begin().await?;
        let revoked = uow
            .verification_tokens()
            .delete_unconsumed_for_user(&user.id)
            .await?;
        uow.verification_tokens().save(&token).await?;
        uow.commit().await?;

        info!(user_id = %user.id, revoked, "Verification token reissued");

        self.send_verification(&user, &token)
    }

    /// 校验会话令牌，得到调用方身份
    pub fn authenticate(&self, token: &str) -> AppResult<AuthenticatedUser> {
        let claims = self.token_service.validate(token).map_err(|e| {
            debug!(reason = %e, "Session token rejected");
            AppError::from(e)
        })?;

        Ok(AuthenticatedUser {
            session_expires_at: claims.expires_at(),
            username: claims.sub,
        })
    }

    fn send_verification(&self, user: &User, token: &VerificationToken) -> AppResult<()> {
        self.notifier
            .notify(VerificationNotice {
                username: user.username.to_string(),
                email: user.email.to_string(),
                token: token.token.clone(),
                expires_at: token.expires_at,
            })
            .inspect_err(|e| {
                warn!(user_id = %user.id, error = %e, "Verification notice not accepted");
            })
    }

    async fn hash_password(&self, password: &str) -> AppResult<HashedPassword> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, hash: HashedPassword) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {}", e)))
    }
}
