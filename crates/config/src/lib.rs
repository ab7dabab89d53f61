//! agora-config - 配置加载库
//!
//! 加载顺序：`{dir}/default.toml` → `{dir}/{APP_ENV}.toml` → `AGORA_` 前缀环境变量
//! （嵌套字段用 `__` 分隔，例如 `AGORA_JWT__SECRET`）。

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use thiserror::Error;

/// 开发环境默认签名密钥，生产环境禁止使用
pub const DEV_JWT_SECRET: &str = "dev-only-insecure-signing-secret-change-me";

/// 生产环境签名密钥最小长度（字节）
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// 会话令牌有效期上限（秒），30 天
pub const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 3600;

/// 激活令牌有效期上限（小时），30 天
pub const MAX_VERIFICATION_TTL_HOURS: i64 = 30 * 24;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 数据库配置
///
/// 未配置 `url` 时使用进程内存储。
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<Secret<String>>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    // 根据环境自动调整连接池大小
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 50,
        _ => 10,
    }
}

/// JWT 配置
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    #[serde(default = "default_expires_in_secs")]
    pub expires_in_secs: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_expires_in_secs() -> u64 {
    900
}

fn default_issuer() -> String {
    "agora".to_string()
}

/// 账户验证配置
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// 验证链接前缀，例如 `http://localhost:8080`
    pub base_url: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `/metrics` 单独监听的端口，与 API 端口分开
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_port: default_metrics_port(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9100
}

/// 邮件配置
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    pub from_email: String,
    pub from_name: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 后台发送队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    256
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub app_env: String,
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub verification: VerificationConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let config: Self = Self::figment(config_dir, &env).extract()?;
        Ok(config)
    }

    /// 构建配置源，便于测试时直接 extract
    pub fn figment(config_dir: &str, env: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("AGORA_").split("__"))
    }

    /// 校验安全相关配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.jwt.secret.expose_secret();
        if secret.trim().is_empty() {
            return Err(ConfigError::Invalid("jwt.secret must not be empty".into()));
        }

        if self.is_production() {
            if secret == DEV_JWT_SECRET {
                return Err(ConfigError::Invalid(
                    "jwt.secret must be overridden in production".into(),
                ));
            }
            if secret.len() < MIN_PRODUCTION_SECRET_LEN {
                return Err(ConfigError::Invalid(format!(
                    "jwt.secret must be at least {} bytes in production",
                    MIN_PRODUCTION_SECRET_LEN
                )));
            }
        }

        if self.jwt.expires_in_secs == 0 || self.jwt.expires_in_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "jwt.expires_in_secs must be between 1 and {}",
                MAX_SESSION_TTL_SECS
            )));
        }

        if self.verification.token_ttl_hours <= 0
            || self.verification.token_ttl_hours > MAX_VERIFICATION_TTL_HOURS
        {
            return Err(ConfigError::Invalid(format!(
                "verification.token_ttl_hours must be between 1 and {}",
                MAX_VERIFICATION_TTL_HOURS
            )));
        }

        if self.verification.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "verification.cleanup_interval_secs must be positive".into(),
            ));
        }

        if self.verification.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("verification.base_url must be set".into()));
        }

        if self.telemetry.metrics_port == self.server.port {
            return Err(ConfigError::Invalid(
                "telemetry.metrics_port must differ from server.port".into(),
            ));
        }

        if self.email.queue_capacity == 0 {
            return Err(ConfigError::Invalid("email.queue_capacity must be positive".into()));
        }

        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

#[cfg(test)]
mod tests;
