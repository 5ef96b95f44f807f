//! Gate errors
//!
//! 对外只暴露三种消息 (`{ "error": ... }`)，内部细节只写日志。
//! 响应统一经由 [`AppError`] 生成。

use axum::response::{IntoResponse, Response};
use shared::error::{AppError, ErrorCategory, ErrorCode};
use thiserror::Error;

pub const MSG_EMAIL_MISSING: &str = "E-Mail-Adresse fehlt";
pub const MSG_EMAIL_NOT_ALLOWED: &str = "E-Mail-Adresse nicht zugelassen";
pub const MSG_SERVER_ERROR: &str = "Serverfehler";

#[derive(Debug, Error)]
pub enum GateError {
    #[error("email missing")]
    EmailMissing,

    #[error("email not on allow-list")]
    EmailNotAllowed,

    /// Unreadable, oversized or non-JSON body
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("allow-list lookup failed: {0}")]
    AllowList(String),

    #[error("magic code delivery failed: {0}")]
    Mailer(String),

    #[error("login request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Unexpected failures all map to 500
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::EmailMissing => ErrorCode::EmailMissing,
            Self::EmailNotAllowed => ErrorCode::EmailNotAllowed,
            Self::InvalidBody(_) | Self::AllowList(_) | Self::Mailer(_) | Self::Timeout(_) => {
                ErrorCode::InternalError
            }
            Self::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// Public message; everything unexpected collapses to "Serverfehler"
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::EmailMissing => MSG_EMAIL_MISSING,
            Self::EmailNotAllowed => MSG_EMAIL_NOT_ALLOWED,
            _ => MSG_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        Self::AllowList(err.to_string())
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        let app = AppError::with_message(err.code(), err.public_message());
        if err.code().category() == ErrorCategory::System {
            app.with_detail("cause", err.to_string())
        } else {
            app
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        // 系统错误由 AppError 记录 (含 cause)
        if self.code().category() != ErrorCategory::System {
            tracing::info!(reason = %self, "Login request rejected");
        }
        AppError::from(self).into_response()
    }
}
