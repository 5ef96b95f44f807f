//! Login gate client
//!
//! `POST {gate_url}/api/login` 携带 `{ email }`：
//! 204 表示已发送登录码，其他状态带 `{ error }` 消息。

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use shared::error::ErrorBody;
use validator::ValidateEmail;

use crate::{ClientConfig, ClientError, ClientResult};

/// 邮箱为空
pub const EMAIL_MISSING: &str = "E-Mail-Adresse fehlt";
/// 邮箱格式错误
pub const EMAIL_INVALID: &str = "Bitte gib eine gültige E-Mail-Adresse ein";
/// Fallback when the gate sends no readable error body
pub const SERVER_ERROR: &str = "Serverfehler";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
}

/// Client for the allow-list login gate
#[derive(Debug, Clone)]
pub struct LoginGateClient {
    client: Client,
    base_url: String,
}

impl LoginGateClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.gate_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the gate to e-mail a login code
    ///
    /// 本地先检查邮箱是否为空、格式是否正确，不合法时不发请求。
    pub async fn request_login_code(&self, email: &str) -> ClientResult<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ClientError::Validation(EMAIL_MISSING.into()));
        }
        if !email.validate_email() {
            return Err(ClientError::Validation(EMAIL_INVALID.into()));
        }

        let url = format!("{}/api/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT || status.is_success() {
            tracing::debug!("Login code requested");
            return Ok(());
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| SERVER_ERROR.to_string());
        tracing::warn!(status = %status, message = %message, "Login gate rejected request");

        Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
