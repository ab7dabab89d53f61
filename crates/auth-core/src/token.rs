//! 会话令牌服务

use agora_errors::{AppError, AppResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    /// JWT ID
    pub jti: String,
    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn new(subject: &str, expires_in: Duration, issuer: &str) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            jti: Uuid::now_v7().to_string(),
            iss: issuer.to_string(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// 令牌校验失败原因
///
/// 对外统一表现为 401，区分仅用于日志。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Malformed token")]
    Malformed,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::unauthenticated(err.to_string())
    }
}

/// 已签发的会话令牌
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token 服务
///
/// 无状态：有效性完全由令牌内容和服务端密钥决定。
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in: Duration,
    issuer: String,
}

impl TokenService {
    pub fn new(secret: &str, expires_in: Duration, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[&issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0; // 不允许时间偏差

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            expires_in,
            issuer,
        }
    }

    /// 签发会话令牌
    pub fn issue(&self, subject: &str) -> AppResult<IssuedToken> {
        let claims = Claims::new(subject, self.expires_in, &self.issuer);
        let expires_at = claims.expires_at();

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// 校验会话令牌
    ///
    /// 先校验签名再解析内容，因此令牌任一段内的字符被改动都会得到
    /// [`TokenError::InvalidSignature`]。
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let (message, signature) = split_token(token)?;

        let verified =
            jsonwebtoken::crypto::verify(signature, message.as_bytes(), &self.decoding_key, ALGORITHM)
                .map_err(|_| TokenError::InvalidSignature)?;
        if !verified {
            return Err(TokenError::InvalidSignature);
        }

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidIssuer
                    | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
                    _ => TokenError::Malformed,
                }
            })?;

        Ok(token_data.claims)
    }
}

/// 拆分为 (`header.payload`, `signature`)，三段都必须非空
fn split_token(token: &str) -> Result<(&str, &str), TokenError> {
    let (message, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
    let (header, payload) = message.split_once('.').ok_or(TokenError::Malformed)?;

    if header.is_empty() || payload.is_empty() || signature.is_empty() || payload.contains('.') {
        return Err(TokenError::Malformed);
    }

    Ok((message, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const SECRET: &str = "test-secret-key-at-least-32-chars-long";
    const ISSUER: &str = "agora-test";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::minutes(15), ISSUER)
    }

    #[test]
    fn test_issue_and_validate() {
        let service = service();
        let issued = service.issue("alice").unwrap();

        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.subject(), "alice");
        assert_eq!(claims.iss, ISSUER);
        assert!(!claims.jti.is_empty());
        assert!(claims.expires_at() > Utc::now());
        assert_eq!(claims.expires_at(), issued.expires_at);
    }

    #[test]
    fn test_expiry_uses_configured_duration() {
        let service = TokenService::new(SECRET, Duration::minutes(5), ISSUER);
        let issued = service.issue("alice").unwrap();
        let claims = service.validate(&issued.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = TokenService::new(SECRET, Duration::seconds(-60), ISSUER);
        let issued = service.issue("alice").unwrap();

        assert_eq!(service.validate(&issued.token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = TokenService::new("a-completely-different-secret-value", Duration::minutes(15), ISSUER);
        let issued = other.issue("alice").unwrap();

        assert_eq!(
            service().validate(&issued.token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let other = TokenService::new(SECRET, Duration::minutes(15), "someone-else");
        let issued = other.issue("alice").unwrap();

        assert_eq!(
            service().validate(&issued.token).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn test_any_single_character_change_rejected() {
        let service = service();
        let token = service.issue("alice").unwrap().token;

        for (index, original) in token.char_indices() {
            if original == '.' {
                continue;
            }
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..index + 1, &replacement.to_string());

            assert_eq!(
                service.validate(&tampered).unwrap_err(),
                TokenError::InvalidSignature,
                "tampering at byte {} was not detected",
                index
            );
        }
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let service = service();
        for token in ["", "not-a-token", "a.b", "a..c", ".b.c", "a.b.", "a.b.c.d"] {
            assert_eq!(
                service.validate(token).unwrap_err(),
                TokenError::Malformed,
                "{:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_signed_garbage_payload_is_malformed() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"definitely not json");
        let message = format!("{}.{}", header, payload);
        let signature = jsonwebtoken::crypto::sign(
            message.as_bytes(),
            &EncodingKey::from_secret(SECRET.as_bytes()),
            ALGORITHM,
        )
        .unwrap();

        let token = format!("{}.{}", message, signature);
        assert_eq!(service().validate(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_token_error_maps_to_unauthenticated() {
        for err in [TokenError::Expired, TokenError::InvalidSignature, TokenError::Malformed] {
            let app_error: AppError = err.into();
            assert_eq!(app_error.status_code(), 401);
        }
    }
}
