//! Allow-list lookup
//!
//! 只有列表中的邮箱 (精确匹配) 才会收到登录码。

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GateError;

#[async_trait]
pub trait AllowList: Send + Sync {
    async fn is_allowed(&self, email: &str) -> Result<bool, GateError>;
}

/// Fixed set of addresses from config / file
#[derive(Debug, Clone, Default)]
pub struct StaticAllowList {
    emails: HashSet<String>,
}

impl StaticAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// One address per line; blank lines and `#` comments are skipped
    pub fn from_file(path: &Path) -> Result<Self, GateError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::Config(format!("cannot read allow-list {}: {}", path.display(), e))
        })?;
        Ok(Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        ))
    }

    pub fn extend<I, S>(&mut self, emails: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emails.extend(emails.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

#[async_trait]
impl AllowList for StaticAllowList {
    async fn is_allowed(&self, email: &str) -> Result<bool, GateError> {
        Ok(self.emails.contains(email))
    }
}

#[derive(Debug, Deserialize)]
struct AllowedUser {
    email: String,
}

/// `allowed_users` table behind a PostgREST endpoint
#[derive(Debug, Clone)]
pub struct RestAllowList {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestAllowList {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }
}

#[async_trait]
impl AllowList for RestAllowList {
    async fn is_allowed(&self, email: &str) -> Result<bool, GateError> {
        let filter = format!("eq.{}", email);
        let response = self
            .client
            .get(format!("{}/rest/v1/allowed_users", self.base_url))
            .query(&[("select", "email"), ("email", filter.as_str())])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GateError::AllowList(format!("status {}", status)));
        }
        let users: Vec<AllowedUser> = response.json().await?;
        // 后端过滤之外再做一次精确比较
        Ok(users.iter().any(|user| user.email == email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_static_exact_match() {
        let list = StaticAllowList::new(["gast@example.com"]);
        assert!(list.is_allowed("gast@example.com").await.unwrap());
        assert!(!list.is_allowed("Gast@example.com").await.unwrap());
        assert!(!list.is_allowed("gast@example.com ").await.unwrap());
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# Team").unwrap();
        writeln!(file, "anna@example.com").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  max@example.com  ").unwrap();

        let list = StaticAllowList::from_file(file.path()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.is_allowed("max@example.com").await.unwrap());
        assert!(!list.is_allowed("# Team").await.unwrap());
    }

    #[test]
    fn test_missing_file() {
        let err = StaticAllowList::from_file(Path::new("/nonexistent/allow.txt")).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }
}
