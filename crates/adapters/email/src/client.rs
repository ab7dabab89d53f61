//! 邮件客户端实现

use crate::{EmailConfig, EmailSender};
use agora_errors::{AppError, AppResult};
use lettre::message::{Mailbox, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info};

/// 邮件消息
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: String,
}

/// 邮件客户端
///
/// 传输在构造时建立一次，连接由 lettre 的连接池复用。
pub struct EmailClient {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailClient {
    /// 根据配置创建邮件客户端
    ///
    /// `use_tls = false` 时使用明文连接，仅适用于本地调试用的 SMTP 服务。
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse::<Mailbox>()
            .map_err(|e| AppError::internal(format!("Invalid from address: {}", e)))?;

        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host).map_err(
                |e| AppError::internal(format!("Failed to create SMTP transport: {}", e)),
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        }
        .port(config.smtp_port)
        .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().clone(),
            ));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    /// 构建邮件消息
    fn build_message(&self, msg: &EmailMessage) -> AppResult<Message> {
        let to = msg
            .to
            .parse::<Mailbox>()
            .map_err(|e| AppError::validation(format!("Invalid to address: {}", e)))?;

        let text_part = SinglePart::builder()
            .header(header::ContentType::TEXT_PLAIN)
            .body(msg.text_body.clone());

        let body = match &msg.html_body {
            Some(html) => MultiPart::alternative().singlepart(text_part).singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html.clone()),
            ),
            None => MultiPart::alternative().singlepart(text_part),
        };

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&msg.subject)
            .multipart(body)
            .map_err(|e| AppError::internal(format!("Failed to build message: {}", e)))
    }

    async fn send_message(&self, msg: &EmailMessage) -> AppResult<()> {
        let message = self.build_message(msg)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::delivery(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl EmailSender for EmailClient {
    async fn send_text_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        debug!(to = %to, subject = %subject, "Sending text email");

        self.send_message(&EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: None,
            text_body: body.to_string(),
        })
        .await?;

        info!(to = %to, subject = %subject, "Text email sent");
        Ok(())
    }

    async fn send_html_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
        text_body: Option<&str>,
    ) -> AppResult<()> {
        debug!(to = %to, subject = %subject, "Sending HTML email");

        self.send_message(&EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body: Some(html_body.to_string()),
            text_body: text_body.unwrap_or_default().to_string(),
        })
        .await?;

        info!(to = %to, subject = %subject, "HTML email sent");
        Ok(())
    }
}
