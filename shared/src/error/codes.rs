//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 7xxx: Table errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 on the wire so the frontend can match on plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Local input check failed
    ValidationFailed = 2,
    /// Response could not be decoded
    InvalidFormat = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Edit session ran out before saving
    SessionExpired = 1005,
    /// E-mail address missing from login request
    EmailMissing = 1008,
    /// E-mail address not on the allow-list
    EmailNotAllowed = 1009,
    /// Magic code invalid or expired
    VerificationCodeInvalid = 1010,

    // ==================== 2xxx: Permission ====================
    /// Action not allowed in the current lock state
    PermissionDenied = 2001,

    // ==================== 7xxx: Table ====================
    TableNotFound = 7001,
    /// Table is locked by another editor
    TableLocked = 7002,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    NetworkError = 9003,
    TimeoutError = 9004,
    ConfigError = 9005,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidFormat => "Invalid format",

            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::SessionExpired => "Edit session has expired",
            ErrorCode::EmailMissing => "E-mail address is missing",
            ErrorCode::EmailNotAllowed => "E-mail address is not allowed",
            ErrorCode::VerificationCodeInvalid => "Invalid verification code",

            ErrorCode::PermissionDenied => "Permission denied",

            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableLocked => "Table is locked by another editor",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            6 => Ok(ErrorCode::InvalidFormat),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1005 => Ok(ErrorCode::SessionExpired),
            1008 => Ok(ErrorCode::EmailMissing),
            1009 => Ok(ErrorCode::EmailNotAllowed),
            1010 => Ok(ErrorCode::VerificationCodeInvalid),

            2001 => Ok(ErrorCode::PermissionDenied),

            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableLocked),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
