//! 过期激活令牌定期清理

use std::sync::Arc;
use std::time::Duration;

use agora_errors::AppResult;
use chrono::Utc;
use metrics::counter;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::domain::repositories::VerificationTokenRepository;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct CleanupTask {
    tokens: Arc<dyn VerificationTokenRepository>,
    interval: Duration,
}

impl CleanupTask {
    /// 间隔不足一秒时按一秒处理
    pub fn new(tokens: Arc<dyn VerificationTokenRepository>, interval: Duration) -> Self {
        Self {
            tokens,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Cleanup task started");
            let mut ticker = interval(self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_cleanup().await {
                            error!(error = %e, "Failed to run periodic cleanup");
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("Cleanup task received shutdown signal");
                        break;
                    }
                }
            }
            info!("Cleanup task stopped");
        })
    }

    /// 删除所有已过期的令牌（含已使用的），返回删除数量
    pub async fn run_cleanup(&self) -> AppResult<u64> {
        let removed = self.tokens.delete_expired(Utc::now()).await?;

        if removed > 0 {
            counter!("verification_tokens_purged_total").increment(removed);
            info!(removed, "Expired verification tokens removed");
        } else {
            debug!("No expired verification tokens");
        }

        Ok(removed)
    }
}
