use std::path::PathBuf;
use std::time::Duration;

/// seatplan-gate 配置，从环境变量读取
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | PORT | 3001 | 服务端口 |
/// | ALLOWED_EMAILS | - | 允许登录的邮箱 (逗号分隔) |
/// | ALLOW_LIST_FILE | - | 允许列表文件 (每行一个邮箱，# 开头为注释) |
/// | BACKEND_URL | - | 设置后从后端 `allowed_users` 表查询并通过后端发送登录码 |
/// | BACKEND_SERVICE_KEY | - | 后端 service key |
/// | REQUEST_TIMEOUT_SECS | 30 | 请求超时 |
/// | CORS_ORIGINS | * | 允许的来源 (逗号分隔) |
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub allowed_emails: Vec<String>,
    pub allow_list_file: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub service_key: Option<String>,
    pub request_timeout: Duration,
    /// Empty: any origin
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            allowed_emails: std::env::var("ALLOWED_EMAILS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            allow_list_file: std::env::var("ALLOW_LIST_FILE").ok().map(PathBuf::from),
            backend_url: std::env::var("BACKEND_URL").ok().filter(|v| !v.is_empty()),
            service_key: std::env::var("BACKEND_SERVICE_KEY").ok(),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default()
                .into_iter()
                .filter(|o| o != "*")
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3001,
            allowed_emails: Vec::new(),
            allow_list_file: None,
            backend_url: None,
            service_key: None,
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" a@example.com, ,b@example.com "),
            vec!["a@example.com", "b@example.com"]
        );
        assert!(split_list("").is_empty());
    }
}
