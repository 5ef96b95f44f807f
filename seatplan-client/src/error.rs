//! Client error types

use shared::error::ErrorCode;
use thiserror::Error;

/// 对用户展示的通用连接失败提示
pub const CONNECTION_FAILED: &str = "Verbindung zum Server fehlgeschlagen.";
/// 桌台被他人锁定
pub const TABLE_LOCKED: &str = "Dieser Tisch wird gerade bearbeitet.";
/// 登录码错误
pub const CODE_INVALID: &str = "Der Code ist ungültig.";
/// 编辑超时
pub const EDIT_EXPIRED: &str = "Die Bearbeitungszeit ist abgelaufen.";

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Magic code wrong or expired
    #[error("Invalid magic code")]
    InvalidCode,

    /// Action not allowed for this editor (e.g. unlocking an own lock)
    #[error("Not allowed: {0}")]
    Forbidden(String),

    /// Rejected by the login gate or auth provider
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Table is locked by another editor
    #[error("Table {0} is locked")]
    Locked(String),

    /// Edit session ran out before saving
    #[error("Edit session expired")]
    SessionExpired,

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend reported an error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Message shown to the user; transport/backend failures collapse to one generic text
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Validation(msg) => msg.clone(),
            Self::Locked(_) => TABLE_LOCKED.to_string(),
            Self::InvalidCode => CODE_INVALID.to_string(),
            Self::SessionExpired => EDIT_EXPIRED.to_string(),
            _ => CONNECTION_FAILED.to_string(),
        }
    }

    /// Map to the unified error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Http(e) if e.is_timeout() => ErrorCode::TimeoutError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::InvalidResponse(_) | Self::Serialization(_) => ErrorCode::InvalidFormat,
            Self::Unauthorized => ErrorCode::NotAuthenticated,
            Self::InvalidCode => ErrorCode::VerificationCodeInvalid,
            Self::Forbidden(_) => ErrorCode::PermissionDenied,
            Self::Rejected { status: 400, .. } => ErrorCode::EmailMissing,
            Self::Rejected { status: 401, .. } => ErrorCode::EmailNotAllowed,
            Self::Rejected { .. } => ErrorCode::InternalError,
            Self::NotFound(_) => ErrorCode::TableNotFound,
            Self::Locked(_) => ErrorCode::TableLocked,
            Self::SessionExpired => ErrorCode::SessionExpired,
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Backend(_) => ErrorCode::DatabaseError,
            Self::Config(_) => ErrorCode::ConfigError,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_is_generic_for_backend_failures() {
        assert_eq!(
            ClientError::Backend("relation does not exist".into()).user_message(),
            CONNECTION_FAILED
        );
        assert_eq!(ClientError::Unauthorized.user_message(), CONNECTION_FAILED);
    }

    #[test]
    fn test_user_message_keeps_gate_rejection() {
        let err = ClientError::Rejected {
            status: 401,
            message: "E-Mail-Adresse nicht zugelassen".into(),
        };
        assert_eq!(err.user_message(), "E-Mail-Adresse nicht zugelassen");
        assert_eq!(err.error_code(), ErrorCode::EmailNotAllowed);
    }

    #[test]
    fn test_invalid_code_message() {
        let err = ClientError::InvalidCode;
        assert_eq!(err.user_message(), CODE_INVALID);
        assert_eq!(err.error_code(), ErrorCode::VerificationCodeInvalid);
        assert_eq!(
            ClientError::Forbidden("own lock".into()).error_code(),
            ErrorCode::PermissionDenied
        );
    }
}
