//! Graceful Shutdown

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 等待关闭信号（Ctrl+C 或 SIGTERM）
///
/// 信号处理器安装失败时只记录日志，对应分支永不完成。
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

/// 等待后台任务结束
///
/// 任务 panic 或被取消时记录 `error!` 并返回 false。
pub async fn join_task(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => {
            info!(task = name, "Background task finished");
            true
        }
        Err(e) => {
            error!(task = name, error = %e, "Background task terminated abnormally");
            false
        }
    }
}

/// Shutdown 控制器
///
/// 包装 `CancellationToken`：进程信号或显式调用 [`Shutdown::trigger`] 都会让
/// 所有后台任务观察到取消。
#[derive(Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// 供后台任务监听的取消令牌
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 触发关闭
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            info!("Triggering shutdown");
        }
        self.token.cancel();
    }

    /// 等待进程信号或显式触发，返回前确保令牌已取消
    ///
    /// 用作 `axum::serve(..).with_graceful_shutdown(..)` 的参数。
    pub async fn wait(self) {
        tokio::select! {
            _ = shutdown_signal() => {},
            _ = self.token.cancelled() => {},
        }
        self.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_cancels_token() {
        let shutdown = Shutdown::new();
        let token = shutdown.token();
        assert!(!token.is_cancelled());

        shutdown.trigger();
        assert!(token.is_cancelled());
        assert!(shutdown.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_join_task_reports_panic() {
        let ok = tokio::spawn(async {});
        assert!(join_task("ok", ok).await);

        let panicked = tokio::spawn(async { panic!("worker crashed") });
        assert!(!join_task("panicked", panicked).await);
    }

    #[tokio::test]
    async fn test_wait_returns_after_trigger() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(shutdown.clone().wait());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
