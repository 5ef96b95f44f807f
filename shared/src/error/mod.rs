//! Unified error system for seatplan
//!
//! - [`ErrorCode`]: Standardized error codes
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Error type with code, message and details
//! - [`ErrorBody`]: `{ error }` response body
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 7xxx: Table errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::with_message(ErrorCode::EmailMissing, "E-Mail-Adresse fehlt")
//!     .with_detail("field", "email");
//! assert_eq!(err.http_status(), shared::http::StatusCode::BAD_REQUEST);
//! assert_eq!(err.to_body().error, "E-Mail-Adresse fehlt");
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, ErrorBody};
