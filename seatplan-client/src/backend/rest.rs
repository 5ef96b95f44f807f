//! PostgREST-style HTTP backend
//!
//! | 操作 | 请求 |
//! |------|------|
//! | fetch_tables | `GET /rest/v1/tables?select=*&order=index.asc` |
//! | insert_table | `POST /rest/v1/tables` + `Prefer: return=representation` |
//! | update_table | `PATCH /rest/v1/tables?id=eq.<id>` |
//! | verify_magic_code | `POST /auth/v1/verify` |
//! | sign_out | `POST /auth/v1/logout` |
//!
//! 实时订阅通过轮询实现：定期拉取快照并与上一次比较，
//! 新 id 推送 `Insert`，内容变化推送 `Update`。
//! 在线人数只在本进程内统计。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::message::TableChange;
use shared::models::{Table, TableCreate, TableId, TablePatch};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use super::{
    AuthBackend, CHANGE_CHANNEL_CAPACITY, PresenceBackend, PresenceRegistry, TableBackend, User,
};
use crate::{ClientConfig, ClientError, ClientResult};

const TABLES_PATH: &str = "rest/v1/tables";

/// Session returned by the auth endpoint
#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    user: User,
}

/// PostgREST / GoTrue error body (fields vary by endpoint)
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message.or(self.msg).or(self.error_description)
    }
}

#[derive(Debug)]
struct Inner {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: RwLock<Option<String>>,
    current_user: RwLock<Option<User>>,
    changes: broadcast::Sender<TableChange>,
    version: AtomicU64,
    poll_interval: Duration,
}

/// HTTP backend speaking the PostgREST / GoTrue conventions
#[derive(Debug)]
pub struct RestBackend {
    inner: Arc<Inner>,
    /// 轮询任务的取消令牌，None 表示未订阅
    poll_token: Mutex<Option<CancellationToken>>,
    /// PostgREST 没有 presence 通道，只统计本进程内的客户端
    presence: PresenceRegistry,
}

impl RestBackend {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let base_url = config
            .backend_url
            .clone()
            .ok_or_else(|| ClientError::Config("BACKEND_URL is required for the REST backend".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_key: config.api_key.clone().unwrap_or_default(),
                access_token: RwLock::new(None),
                current_user: RwLock::new(None),
                changes,
                version: AtomicU64::new(0),
                poll_interval: config.realtime_poll_interval,
            }),
            poll_token: Mutex::new(None),
            presence: PresenceRegistry::default(),
        })
    }

    /// Whether the polling task is running
    pub fn is_polling(&self) -> bool {
        self.poll_token.lock().is_some()
    }
}

impl Drop for RestBackend {
    fn drop(&mut self) {
        if let Some(token) = self.poll_token.lock().take() {
            token.cancel();
        }
    }
}

impl Inner {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// apikey + bearer (session token if signed in, else the anon key)
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.api_key.clone());
        request
            .header("apikey", &self.api_key)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", bearer))
    }

    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let response = Self::check_status(response).await?;
        response.json().await.map_err(Into::into)
    }

    async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await?;
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or(text);
        tracing::debug!(status = %status, message = %message, "Backend request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized,
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            _ => ClientError::Backend(format!("{}: {}", status, message)),
        })
    }

    async fn fetch_tables(&self) -> ClientResult<Vec<Table>> {
        let request = self
            .client
            .get(self.url(TABLES_PATH))
            .query(&[("select", "*"), ("order", "index.asc")]);
        let response = self.authorize(request).send().await?;
        let mut tables: Vec<Table> = Self::handle_response(response).await?;
        tables.iter_mut().for_each(Table::clamp_seats);
        Ok(tables)
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Diff two snapshots into change notifications
fn diff_snapshots(
    previous: &HashMap<TableId, Table>,
    current: &[Table],
    mut next_version: impl FnMut() -> u64,
) -> Vec<TableChange> {
    current
        .iter()
        .filter_map(|table| match previous.get(&table.id) {
            None => Some(TableChange::insert(next_version(), table.clone())),
            Some(old) if old != table => Some(TableChange::update(next_version(), table.clone())),
            Some(_) => None,
        })
        .collect()
}

fn snapshot(tables: Vec<Table>) -> HashMap<TableId, Table> {
    tables.into_iter().map(|t| (t.id.clone(), t)).collect()
}

async fn poll_loop(inner: Arc<Inner>, token: CancellationToken) {
    tracing::info!(interval_ms = inner.poll_interval.as_millis() as u64, "Realtime polling started");

    // 初始快照失败时从空快照开始，之后全部作为 Insert 推送
    let mut known = match inner.fetch_tables().await {
        Ok(tables) => snapshot(tables),
        Err(e) => {
            tracing::warn!(error = %e, "Initial realtime snapshot failed");
            HashMap::new()
        }
    };

    let mut ticker = tokio::time::interval(inner.poll_interval.max(Duration::from_millis(50)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                match inner.fetch_tables().await {
                    Ok(tables) => {
                        for change in diff_snapshots(&known, &tables, || inner.next_version()) {
                            let _ = inner.changes.send(change);
                        }
                        known = snapshot(tables);
                    }
                    Err(e) => tracing::warn!(error = %e, "Realtime poll failed"),
                }
            }
        }
    }

    tracing::info!("Realtime polling stopped");
}

#[async_trait]
impl TableBackend for RestBackend {
    async fn fetch_tables(&self) -> ClientResult<Vec<Table>> {
        self.inner.fetch_tables().await
    }

    async fn insert_table(&self, data: TableCreate) -> ClientResult<Table> {
        let request = self
            .inner
            .client
            .post(self.inner.url(TABLES_PATH))
            .header("Prefer", "return=representation")
            .json(&data);
        let response = self.inner.authorize(request).send().await?;
        let rows: Vec<Table> = Inner::handle_response(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidResponse("insert returned no row".into()))
    }

    async fn update_table(&self, id: &TableId, patch: TablePatch) -> ClientResult<Table> {
        let filter = format!("eq.{}", id);
        let request = self
            .inner
            .client
            .patch(self.inner.url(TABLES_PATH))
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.inner.authorize(request).send().await?;
        let rows: Vec<Table> = Inner::handle_response(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("Table {}", id)))
    }

    fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        let receiver = self.inner.changes.subscribe();
        let mut slot = self.poll_token.lock();
        if slot.is_none() {
            let token = CancellationToken::new();
            tokio::spawn(poll_loop(self.inner.clone(), token.clone()));
            *slot = Some(token);
        }
        receiver
    }

    fn unsubscribe(&self) {
        if let Some(token) = self.poll_token.lock().take() {
            token.cancel();
        }
    }
}

#[async_trait]
impl AuthBackend for RestBackend {
    async fn verify_magic_code(&self, email: &str, code: &str) -> ClientResult<User> {
        let body = serde_json::json!({ "type": "email", "email": email, "token": code });
        let request = self
            .inner
            .client
            .post(self.inner.url("auth/v1/verify"))
            .json(&body);
        let response = self.inner.authorize(request).send().await?;
        let session: SessionResponse = Inner::handle_response(response).await?;

        tracing::info!(user_id = %session.user.id, "Signed in");
        *self.inner.access_token.write() = Some(session.access_token);
        *self.inner.current_user.write() = Some(session.user.clone());
        Ok(session.user)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        let request = self.inner.client.post(self.inner.url("auth/v1/logout"));
        let result = self.inner.authorize(request).send().await;

        // 本地会话无论如何都清除
        *self.inner.access_token.write() = None;
        *self.inner.current_user.write() = None;

        Inner::check_status(result?).await?;
        Ok(())
    }

    fn current_user(&self) -> Option<User> {
        self.inner.current_user.read().clone()
    }
}

impl PresenceBackend for RestBackend {
    fn track_presence(&self, key: &str) -> watch::Receiver<usize> {
        self.presence.track(key)
    }

    fn untrack_presence(&self, key: &str) {
        self.presence.untrack(key);
    }
}
