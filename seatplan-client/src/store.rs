//! Table store
//!
//! 显式构造的应用上下文：持有后端句柄、提示队列和桌台状态。
//! 克隆代价很低 (共享 `Arc`)，不存在全局单例。
//!
//! # 实时合并
//!
//! | 变更 | 处理 |
//! |------|------|
//! | `Update` | 替换相同 id 的记录；未知 id 忽略 |
//! | `Insert` | 不存在则追加并按 index 重新排序 |
//!
//! 同一记录以最后一次写入为准。
//!
//! # 在线人数
//!
//! `presence_subscribe(key)` 以 editor id 加入后端的 presence 通道，
//! `users_online()` 读取最新人数；取消订阅后为 0。

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use shared::message::{ChangeAction, TableChange};
use shared::models::{
    MAX_SEATS, MIN_SEATS, Reservation, SeatKey, Table, TableCreate, TableId, TablePatch,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, User};
use crate::lock::can_unlock;
use crate::toast::Toasts;
use crate::{ClientError, ClientResult};

/// Seat count bounds exposed to the edit form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatLimits {
    pub min_seats: u8,
    pub max_seats: u8,
}

impl Default for SeatLimits {
    fn default() -> Self {
        Self {
            min_seats: MIN_SEATS,
            max_seats: MAX_SEATS,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    tables: Vec<Table>,
    subscribed: bool,
    is_authenticated: bool,
}

impl StoreState {
    fn apply_change(&mut self, change: TableChange) {
        let mut table = change.table;
        table.clamp_seats();
        if let Some(slot) = self.tables.iter_mut().find(|t| t.id == table.id) {
            *slot = table;
            return;
        }

        match change.action {
            ChangeAction::Update => {
                tracing::debug!(id = %table.id, "Update for unknown table ignored");
            }
            ChangeAction::Insert => {
                self.tables.push(table);
                self.sort();
            }
        }
    }

    fn sort(&mut self) {
        self.tables.sort_by(|a, b| a.index.cmp(&b.index));
    }
}

/// 实时订阅令牌；最后一个 store 句柄释放时取消监听任务
#[derive(Debug, Default)]
struct Subscription {
    token: Mutex<Option<CancellationToken>>,
}

impl Subscription {
    fn cancel(&self) -> bool {
        match self.token.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// 已加入的 presence 通道；释放时离开
struct Presence {
    backend: Arc<dyn Backend>,
    key: String,
    online: watch::Receiver<usize>,
}

impl Drop for Presence {
    fn drop(&mut self) {
        self.backend.untrack_presence(&self.key);
    }
}

/// Shared table state over a backend
#[derive(Clone)]
pub struct TableStore {
    backend: Arc<dyn Backend>,
    toasts: Toasts,
    state: Arc<RwLock<StoreState>>,
    subscription: Arc<Subscription>,
    presence: Arc<Mutex<Option<Presence>>>,
    limits: SeatLimits,
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("TableStore")
            .field("tables", &state.tables.len())
            .field("subscribed", &state.subscribed)
            .field("is_authenticated", &state.is_authenticated)
            .field("users_online", &self.users_online())
            .field("limits", &self.limits)
            .finish()
    }
}

impl TableStore {
    pub fn new(backend: Arc<dyn Backend>, toasts: Toasts) -> Self {
        Self {
            backend,
            toasts,
            state: Arc::new(RwLock::new(StoreState::default())),
            subscription: Arc::new(Subscription::default()),
            presence: Arc::new(Mutex::new(None)),
            limits: SeatLimits::default(),
        }
    }

    pub fn limits(&self) -> SeatLimits {
        self.limits
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    // ========== State ==========

    /// Snapshot of all tables, ordered by index
    pub fn tables(&self) -> Vec<Table> {
        self.state.read().tables.clone()
    }

    pub fn table(&self, id: &TableId) -> Option<Table> {
        self.state.read().tables.iter().find(|t| &t.id == id).cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.read().subscribed
    }

    pub fn set_auth_state(&self, is_authenticated: bool) {
        self.state.write().is_authenticated = is_authenticated;
    }

    /// Reservations to compare a seat name against
    ///
    /// `seat = Some(key)` 时只排除该座位本身；`None` 时排除整张桌台。
    pub fn reservations_except(&self, id: &TableId, seat: Option<SeatKey>) -> Vec<Reservation> {
        let state = self.state.read();
        state
            .tables
            .iter()
            .flat_map(|table| {
                table
                    .seat_entries()
                    .filter(move |(key, name)| {
                        let excluded = &table.id == id && seat.is_none_or(|s| s == *key);
                        !excluded && !name.trim().is_empty()
                    })
                    .map(move |(_, name)| Reservation {
                        name: name.to_string(),
                        table: table.name.clone(),
                    })
            })
            .collect()
    }

    /// Names of all other tables
    pub fn table_names_except(&self, id: &TableId) -> Vec<String> {
        self.state
            .read()
            .tables
            .iter()
            .filter(|t| &t.id != id)
            .map(|t| t.name.clone())
            .collect()
    }

    // ========== Backend operations ==========

    fn report(&self, action: &'static str, err: ClientError) -> ClientError {
        tracing::error!(action = action, code = %err.error_code(), error = %err, "Backend request failed");
        self.toasts.error(err.user_message());
        err
    }

    /// Load all tables from the backend
    pub async fn fetch_entries(&self) -> ClientResult<()> {
        match self.backend.fetch_tables().await {
            Ok(mut tables) => {
                tables.iter_mut().for_each(Table::clamp_seats);
                tracing::debug!(count = tables.len(), "Tables loaded");
                self.state.write().tables = tables;
                Ok(())
            }
            Err(e) => Err(self.report("fetch_entries", e)),
        }
    }

    /// Partial update of one table
    pub async fn update_entry(&self, id: &TableId, patch: TablePatch) -> ClientResult<Table> {
        match self.backend.update_table(id, patch).await {
            Ok(table) => {
                self.state
                    .write()
                    .apply_change(TableChange::update(0, table.clone()));
                Ok(table)
            }
            Err(e) => Err(self.report("update_entry", e)),
        }
    }

    /// Insert a table; only for authenticated users
    pub async fn add_entry(&self, data: TableCreate) -> ClientResult<Table> {
        if !self.is_authenticated() {
            tracing::debug!(name = %data.name, "add_entry refused: not authenticated");
            return Err(ClientError::Unauthorized);
        }
        match self.backend.insert_table(data).await {
            Ok(table) => {
                self.state
                    .write()
                    .apply_change(TableChange::insert(0, table.clone()));
                Ok(table)
            }
            Err(e) => Err(self.report("add_entry", e)),
        }
    }

    /// Manual release of a lock held by another editor
    ///
    /// 只允许已登录用户解除他人的锁；自己的锁通过编辑会话释放。
    pub async fn force_unlock(&self, id: &TableId, editor_id: &str) -> ClientResult<Table> {
        if !self.is_authenticated() {
            return Err(ClientError::Unauthorized);
        }
        let table = self
            .table(id)
            .ok_or_else(|| ClientError::NotFound(format!("Table {}", id)))?;
        if !can_unlock(&table, editor_id, true) {
            tracing::debug!(id = %id, "Unlock refused: not locked by another editor");
            return Err(ClientError::Forbidden(format!(
                "Table {} is not locked by another editor",
                id
            )));
        }
        tracing::info!(id = %id, holder = ?table.locked_by, "Forcing table unlock");
        self.update_entry(id, TablePatch::unlock()).await
    }

    // ========== Auth ==========

    /// Exchange a magic code for a session and mark the store authenticated
    pub async fn sign_in(&self, email: &str, code: &str) -> ClientResult<User> {
        match self.backend.verify_magic_code(email, code).await {
            Ok(user) => {
                self.set_auth_state(true);
                Ok(user)
            }
            Err(ClientError::Unauthorized) => {
                let err = ClientError::InvalidCode;
                tracing::warn!(email = %email, "Magic code rejected");
                self.toasts.error(err.user_message());
                Err(err)
            }
            Err(e) => Err(self.report("sign_in", e)),
        }
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.set_auth_state(false);
        self.backend
            .sign_out()
            .await
            .map_err(|e| self.report("sign_out", e))
    }

    /// Pick up a session the backend already holds
    pub fn restore_session(&self) -> Option<User> {
        let user = self.backend.current_user();
        self.set_auth_state(user.is_some());
        user
    }

    // ========== Realtime ==========

    /// Start merging backend changes into the state; repeated calls are no-ops
    pub fn realtime_subscribe(&self) {
        let mut slot = self.subscription.token.lock();
        if slot.is_some() {
            return;
        }

        let mut rx = self.backend.subscribe();
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        drop(slot);
        self.state.write().subscribed = true;

        let state: Weak<RwLock<StoreState>> = Arc::downgrade(&self.state);
        let subscription: Weak<Subscription> = Arc::downgrade(&self.subscription);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(change) => {
                            let Some(state) = state.upgrade() else { break };
                            tracing::trace!(id = %change.table.id, version = change.version, "Realtime change");
                            state.write().apply_change(change);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped = skipped, "Realtime receiver lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            // 被取消时 realtime_unsubscribe 已更新状态，之后可能已有新的监听任务
            if !token.is_cancelled() {
                if let Some(subscription) = subscription.upgrade() {
                    subscription.token.lock().take();
                }
                if let Some(state) = state.upgrade() {
                    state.write().subscribed = false;
                }
            }
            tracing::debug!("Realtime listener stopped");
        });
    }

    pub fn realtime_unsubscribe(&self) {
        if self.subscription.cancel() {
            self.backend.unsubscribe();
        }
        self.state.write().subscribed = false;
    }

    // ========== Presence ==========

    /// Join the presence channel as `key`; repeated calls are no-ops
    pub fn presence_subscribe(&self, key: &str) {
        let mut slot = self.presence.lock();
        if slot.is_some() {
            return;
        }
        let online = self.backend.track_presence(key);
        tracing::debug!(key = %key, online = *online.borrow(), "Presence joined");
        *slot = Some(Presence {
            backend: self.backend.clone(),
            key: key.to_string(),
            online,
        });
    }

    pub fn presence_unsubscribe(&self) {
        // Drop 负责离开通道
        self.presence.lock().take();
    }

    /// Number of clients currently online; 0 when not subscribed
    pub fn users_online(&self) -> usize {
        self.presence
            .lock()
            .as_ref()
            .map_or(0, |presence| *presence.online.borrow())
    }
}
