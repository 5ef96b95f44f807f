//! Formatting and id helpers

use chrono::{DateTime, Local, TimeZone};
use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `dd.mm.yyyy, HH:MM:SS` in local time; `""` for None / 0
pub fn format_date_time(timestamp_ms: Option<i64>) -> String {
    format_in(timestamp_ms, &Local, "%d.%m.%Y, %H:%M:%S")
}

/// `HH:MM:SS` in local time; `""` for None / 0
pub fn format_time(timestamp_ms: Option<i64>) -> String {
    format_in(timestamp_ms, &Local, "%H:%M:%S")
}

/// Format a millisecond timestamp in the given zone
pub fn format_in<Tz>(timestamp_ms: Option<i64>, tz: &Tz, pattern: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let Some(ms) = timestamp_ms.filter(|ms| *ms != 0) else {
        return String::new();
    };
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => utc.with_timezone(tz).format(pattern).to_string(),
        None => String::new(),
    }
}

/// Ephemeral editor id used as lock holder: `_` + 8 base-36 chars
pub fn create_editor_id() -> String {
    let mut rng = rand::thread_rng();
    let mut id = String::with_capacity(9);
    id.push('_');
    for _ in 0..8 {
        id.push(BASE36[rng.gen_range(0..BASE36.len())] as char);
    }
    id
}

/// Current time in ms since epoch
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
