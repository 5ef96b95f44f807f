use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::allow_list::{AllowList, RestAllowList, StaticAllowList};
use crate::config::Config;
use crate::error::GateError;
use crate::mailer::{LogMagicCodeSender, MagicCodeSender, RestMagicCodeSender};

/// Default upper bound for allow-list lookup plus code delivery
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub allow_list: Arc<dyn AllowList>,
    pub mailer: Arc<dyn MagicCodeSender>,
    /// 单次登录请求 (查询 + 发送) 的最长时间
    pub login_timeout: Duration,
}

impl AppState {
    pub fn new(allow_list: Arc<dyn AllowList>, mailer: Arc<dyn MagicCodeSender>) -> Self {
        Self {
            allow_list,
            mailer,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
        }
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// 有 BACKEND_URL 时走后端，否则使用静态列表 + 日志发送
    pub fn from_config(config: &Config) -> Result<Self, GateError> {
        if let Some(url) = &config.backend_url {
            let key = config
                .service_key
                .clone()
                .ok_or_else(|| GateError::Config("BACKEND_SERVICE_KEY must be set".into()))?;
            info!(backend = %url, "Using backend allow-list");
            return Ok(Self::new(
                Arc::new(RestAllowList::new(url, key.clone(), config.request_timeout)?),
                Arc::new(RestMagicCodeSender::new(url, key, config.request_timeout)?),
            )
            .with_login_timeout(config.request_timeout));
        }

        let mut list = match &config.allow_list_file {
            Some(path) => StaticAllowList::from_file(path)?,
            None => StaticAllowList::default(),
        };
        list.extend(config.allowed_emails.iter().cloned());
        info!(entries = list.len(), "Using static allow-list");

        Ok(Self::new(Arc::new(list), Arc::new(LogMagicCodeSender))
            .with_login_timeout(config.request_timeout))
    }
}
