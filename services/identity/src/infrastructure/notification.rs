//! 激活邮件后台发送
//!
//! 注册请求只把通知放入有界队列；后台任务逐条渲染并发送，
//! 发送失败只记录日志与指标，不影响已提交的账户数据。

use std::sync::Arc;

use agora_adapter_email::{EmailSender, EmailTemplate};
use agora_errors::{AppError, AppResult};
use chrono::Utc;
use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::notification::{Notifier, VerificationNotice};

pub const VERIFICATION_SUBJECT: &str = "Please activate your account";

/// 激活邮件的渲染与发送
pub struct VerificationMailer {
    sender: Arc<dyn EmailSender>,
    template: EmailTemplate,
    base_url: String,
}

impl VerificationMailer {
    pub fn new(
        sender: Arc<dyn EmailSender>,
        template: EmailTemplate,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            template,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `<base-url>/api/auth/accountVerification/<token>`
    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/api/auth/accountVerification/{}", self.base_url, token)
    }

    pub async fn deliver(&self, notice: &VerificationNotice) -> AppResult<()> {
        let link = self.verification_link(&notice.token);

        // 向上取整到小时，至少 1
        let remaining_minutes = (notice.expires_at - Utc::now()).num_minutes();
        let expires_in_hours = ((remaining_minutes + 59) / 60).max(1);

        let (html, text) =
            self.template
                .render_account_verification(&notice.username, &link, expires_in_hours)?;

        self.sender
            .send_html_email(&notice.email, VERIFICATION_SUBJECT, &html, Some(&text))
            .await
    }
}

/// 通知发送队列
///
/// 实现 [`Notifier`]：入队成功即返回，由后台任务完成投递。
#[derive(Clone)]
pub struct NotificationDispatcher {
    queue: mpsc::Sender<VerificationNotice>,
}

impl NotificationDispatcher {
    /// 启动后台发送任务
    ///
    /// 收到 `shutdown` 后停止接收新通知，发送完队列中剩余的通知再退出。
    pub fn start(
        mailer: VerificationMailer,
        capacity: usize,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (queue, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(mailer, rx, shutdown));
        (Self { queue }, handle)
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, notice: VerificationNotice) -> AppResult<()> {
        self.queue.try_send(notice).map_err(|e| match e {
            TrySendError::Full(_) => {
                counter!("notification_rejected_total", "reason" => "full").increment(1);
                AppError::delivery("Notification queue is full")
            }
            TrySendError::Closed(_) => {
                counter!("notification_rejected_total", "reason" => "closed").increment(1);
                AppError::delivery("Notification queue is closed")
            }
        })
    }
}

async fn run_worker(
    mailer: VerificationMailer,
    mut rx: mpsc::Receiver<VerificationNotice>,
    shutdown: CancellationToken,
) {
    info!("Notification worker started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            notice = rx.recv() => match notice {
                Some(notice) => deliver(&mailer, notice).await,
                None => {
                    info!("Notification queue closed, worker stopped");
                    return;
                }
            },
        }
    }

    info!("Notification worker received shutdown signal");
    rx.close();

    let mut drained = 0u64;
    while let Some(notice) = rx.recv().await {
        deliver(&mailer, notice).await;
        drained += 1;
    }

    info!(drained, "Notification worker stopped");
}

async fn deliver(mailer: &VerificationMailer, notice: VerificationNotice) {
    if notice.expires_at <= Utc::now() {
        warn!(username = %notice.username, "Skipping verification email for expired token");
        return;
    }

    match mailer.deliver(&notice).await {
        Ok(()) => {
            counter!("notification_sent_total").increment(1);
            info!(username = %notice.username, "Verification email sent");
        }
        Err(e) => {
            counter!("notification_failures_total").increment(1);
            error!(username = %notice.username, error = %e, "Failed to send verification email");
        }
    }
}
