use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 时间参考：秒级 RFC 3339 + 微秒部分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeReference {
    pub atom: String,
    pub micro: u32,
}

impl TimeReference {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            atom: now.to_rfc3339_opts(SecondsFormat::Secs, false),
            micro: now.timestamp_subsec_micros(),
        }
    }
}

pub async fn time() -> Json<TimeReference> {
    Json(TimeReference::at(Utc::now()))
}
