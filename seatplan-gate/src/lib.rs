//! Seatplan login gate
//!
//! 在发送免密码登录码之前，先检查邮箱是否在允许列表中；
//! 同时提供客户端时钟修正用的时间参考接口。
//!
//! | 路由 | 说明 |
//! |------|------|
//! | `POST /api/login` | `{ email }` -> 204 / 400 / 401 / 500 |
//! | `GET /api/time` | `{ atom, micro }` |
//! | `GET /health` | `{ status: "ok" }` |

pub mod allow_list;
pub mod api;
pub mod config;
pub mod error;
pub mod mailer;
pub mod state;

pub use allow_list::{AllowList, RestAllowList, StaticAllowList};
pub use api::{MAX_BODY_BYTES, TimeReference, router};
pub use config::Config;
pub use error::GateError;
pub use mailer::{LogMagicCodeSender, MagicCodeSender, RestMagicCodeSender};
pub use state::{AppState, DEFAULT_LOGIN_TIMEOUT};
