//! Client configuration
//!
//! 部署时通过环境变量注入：
//!
//! | 环境变量 | 默认值 | 说明 |
//! |----------|--------|------|
//! | APP_NAME | Sitzplan | 应用显示名称 |
//! | BACKEND | memory | 后端类型: memory / rest |
//! | BACKEND_URL | - | REST 后端地址 |
//! | BACKEND_API_KEY | - | REST 后端 API key |
//! | LOGIN_GATE_URL | http://localhost:3001 | 登录网关地址 |
//! | TIME_URL | - | 服务器时间参考地址 |
//! | RELEASE_DATE | - | 功能发布时间 (RFC 3339) |
//! | REALTIME_POLL_MS | 3000 | REST 后端轮询间隔 |
//! | REQUEST_TIMEOUT_SECS | 30 | 请求超时 |

use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::time::Duration;

use crate::{ClientError, ClientResult};

/// Which backend implementation the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// In-process backend (tests, offline demo)
    #[default]
    Memory,
    /// PostgREST-style HTTP backend
    Rest,
}

impl FromStr for BackendKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "rest" | "supabase" | "postgrest" => Ok(Self::Rest),
            other => Err(ClientError::Config(format!("unknown backend: {}", other))),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 应用显示名称
    pub app_name: String,
    /// 后端类型
    pub backend: BackendKind,
    /// REST 后端地址 (e.g. "https://project.example.co")
    pub backend_url: Option<String>,
    /// REST 后端 API key
    pub api_key: Option<String>,
    /// 登录网关地址
    pub gate_url: String,
    /// 服务器时间参考地址
    pub time_url: Option<String>,
    /// 功能发布时间，None 表示立即可用
    pub release_time: Option<DateTime<Utc>>,
    /// REST 后端实时轮询间隔
    pub realtime_poll_interval: Duration,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl ClientConfig {
    /// Load `.env` (if present) and read the environment
    pub fn load() -> ClientResult<Self> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// 从环境变量加载配置
    pub fn from_env() -> ClientResult<Self> {
        let backend = match std::env::var("BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => BackendKind::default(),
        };
        let release_time = match std::env::var("RELEASE_DATE") {
            Ok(v) if !v.trim().is_empty() => Some(parse_release_time(&v)?),
            _ => None,
        };

        Ok(Self {
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "Sitzplan".into()),
            backend,
            backend_url: std::env::var("BACKEND_URL").ok(),
            api_key: std::env::var("BACKEND_API_KEY").ok(),
            gate_url: std::env::var("LOGIN_GATE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".into()),
            time_url: std::env::var("TIME_URL").ok(),
            release_time,
            realtime_poll_interval: Duration::from_millis(
                std::env::var("REALTIME_POLL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3000),
            ),
            timeout: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Use the REST backend at `url`
    pub fn rest(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Rest,
            backend_url: Some(url.into()),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_gate_url(mut self, url: impl Into<String>) -> Self {
        self.gate_url = url.into();
        self
    }

    pub fn with_time_url(mut self, url: impl Into<String>) -> Self {
        self.time_url = Some(url.into());
        self
    }

    pub fn with_release_time(mut self, release_time: DateTime<Utc>) -> Self {
        self.release_time = Some(release_time);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.realtime_poll_interval = interval;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            app_name: "Sitzplan".into(),
            backend: BackendKind::Memory,
            backend_url: None,
            api_key: None,
            gate_url: "http://localhost:3001".into(),
            time_url: None,
            release_time: None,
            realtime_poll_interval: Duration::from_millis(3000),
            timeout: 30,
        }
    }
}

fn parse_release_time(value: &str) -> ClientResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ClientError::Config(format!("invalid RELEASE_DATE '{}': {}", value, e)))
}
