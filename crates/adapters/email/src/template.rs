//! 邮件模板系统

use agora_errors::{AppError, AppResult};
use std::collections::HashMap;
use tera::Tera;

const ACCOUNT_VERIFICATION_HTML: &str = "account_verification.html";
const ACCOUNT_VERIFICATION_TEXT: &str = "account_verification.txt";

/// 邮件模板管理器
pub struct EmailTemplate {
    tera: Tera,
}

impl EmailTemplate {
    /// 内置模板（编译期嵌入）
    pub fn builtin() -> AppResult<Self> {
        let templates = HashMap::from([
            (
                ACCOUNT_VERIFICATION_HTML.to_string(),
                include_str!("../templates/account_verification.html").to_string(),
            ),
            (
                ACCOUNT_VERIFICATION_TEXT.to_string(),
                include_str!("../templates/account_verification.txt").to_string(),
            ),
        ]);
        Self::from_strings(templates)
    }

    /// 从内存中的模板字符串创建
    pub fn from_strings(templates: HashMap<String, String>) -> AppResult<Self> {
        let mut tera = Tera::default();

        for (name, content) in templates {
            tera.add_raw_template(&name, &content).map_err(|e| {
                AppError::internal(format!("Failed to add template {}: {}", name, e))
            })?;
        }

        Ok(Self { tera })
    }

    /// 渲染模板
    pub fn render(&self, template_name: &str, context: &serde_json::Value) -> AppResult<String> {
        let context = tera::Context::from_serialize(context)
            .map_err(|e| AppError::internal(format!("Failed to create template context: {}", e)))?;

        self.tera.render(template_name, &context).map_err(|e| {
            AppError::internal(format!("Failed to render template {}: {}", template_name, e))
        })
    }

    /// 渲染账户激活邮件，返回 (HTML, 纯文本)
    pub fn render_account_verification(
        &self,
        username: &str,
        verification_link: &str,
        expires_in_hours: i64,
    ) -> AppResult<(String, String)> {
        let context = serde_json::json!({
            "username": username,
            "verification_link": verification_link,
            "expires_in_hours": expires_in_hours,
        });

        let html = self.render(ACCOUNT_VERIFICATION_HTML, &context)?;
        let text = self.render(ACCOUNT_VERIFICATION_TEXT, &context)?;

        Ok((html, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_from_strings() {
        let templates = HashMap::from([(
            "test.html".to_string(),
            "<h1>Hello {{ name }}!</h1>".to_string(),
        )]);

        let template = EmailTemplate::from_strings(templates).unwrap();
        let result = template
            .render("test.html", &serde_json::json!({ "name": "World" }))
            .unwrap();
        assert_eq!(result, "<h1>Hello World!</h1>");
    }

    #[test]
    fn test_render_account_verification() {
        let template = EmailTemplate::builtin().unwrap();
        let link = "http://localhost:8080/api/auth/accountVerification/abc123";

        let (html, text) = template
            .render_account_verification("alice", link, 24)
            .unwrap();

        // HTML 版本中的链接经过转义
        assert!(html.contains("Hello alice"));
        assert!(html.contains("abc123"));
        assert!(text.contains("Hello alice"));
        assert!(text.contains(link));
        assert!(text.contains("24 hours"));
    }

    #[test]
    fn test_html_escapes_username() {
        let template = EmailTemplate::builtin().unwrap();
        let (html, _) = template
            .render_account_verification("<script>", "http://localhost/x", 1)
            .unwrap();
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_unknown_template_fails() {
        let template = EmailTemplate::builtin().unwrap();
        assert!(template.render("missing.html", &serde_json::json!({})).is_err());
    }
}
