//! Magic code delivery
//!
//! 登录码由认证服务生成并发送，网关只负责触发。

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GateError;

#[async_trait]
pub trait MagicCodeSender: Send + Sync {
    async fn send_magic_code(&self, email: &str) -> Result<(), GateError>;
}

#[derive(Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
}

/// `POST /auth/v1/otp` on a GoTrue-style auth service
#[derive(Debug, Clone)]
pub struct RestMagicCodeSender {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestMagicCodeSender {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }
}

#[async_trait]
impl MagicCodeSender for RestMagicCodeSender {
    async fn send_magic_code(&self, email: &str) -> Result<(), GateError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/otp", self.base_url))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&OtpRequest {
                email,
                create_user: true,
            })
            .send()
            .await
            .map_err(|e| GateError::Mailer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GateError::Mailer(format!("status {}: {}", status, text)));
        }
        Ok(())
    }
}

/// Development sender: only logs
#[derive(Debug, Clone, Default)]
pub struct LogMagicCodeSender;

#[async_trait]
impl MagicCodeSender for LogMagicCodeSender {
    async fn send_magic_code(&self, email: &str) -> Result<(), GateError> {
        tracing::warn!(email = %email, "No auth backend configured, magic code not sent");
        Ok(())
    }
}
