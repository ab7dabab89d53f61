//! Email 适配器
//!
//! 提供邮件发送功能，支持：
//! - SMTP 邮件发送（异步传输）
//! - 模板渲染
//! - HTML 和纯文本邮件

mod client;
mod template;

pub use agora_config::EmailConfig;
pub use client::{EmailClient, EmailMessage};
pub use template::EmailTemplate;

use agora_errors::AppResult;

/// 邮件发送接口
///
/// 发送失败返回 `AppError::Delivery`。
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// 发送纯文本邮件
    async fn send_text_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()>;

    /// 发送 HTML 邮件（附纯文本备用）
    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> AppResult<()>;
}
