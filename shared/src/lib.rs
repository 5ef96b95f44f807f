//! Shared types for seatplan
//!
//! Common types used by the reservation client and the login gate:
//! table models, realtime change payloads, error codes and the
//! `{ error }` response body.

pub mod error;
pub mod message;
pub mod models;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, ErrorBody, ErrorCategory, ErrorCode};
pub use message::{ChangeAction, TableChange};
pub use models::{
    LockState, Reservation, SeatKey, SortableReservation, Table, TableCreate, TableId, TablePatch,
};
