//! Data models
//!
//! - [`Table`] - 桌台 (座位槽位 + 咨询锁)
//! - [`Reservation`] - 派生的预订视图

pub mod reservation;
pub mod table;

pub use reservation::{Reservation, SortableReservation, sortable_name, sorted_reservations};
pub use table::{
    LockState, MAX_SEATS, MIN_SEATS, SEAT_SLOTS, SeatKey, Table, TableCreate, TableId, TablePatch,
};
