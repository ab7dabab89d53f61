//! 服务运行时

use agora_config::AppConfig;
use agora_telemetry::{LogFormat, TelemetryError, try_init_tracing};
use tracing::info;

/// 按环境选择日志格式：生产环境 JSON，其余可读格式
pub fn log_format(config: &AppConfig) -> LogFormat {
    if config.is_production() {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    }
}

/// 初始化服务运行时
pub fn init_runtime(config: &AppConfig) -> Result<(), TelemetryError> {
    try_init_tracing(&config.telemetry.log_level, log_format(config))?;

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        persistence = if config.database.url.is_some() { "postgres" } else { "memory" },
        "Runtime initialized"
    );

    Ok(())
}
