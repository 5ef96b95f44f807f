//! In-process backend
//!
//! 所有数据保存在内存中，id 递增分配，变更通过 broadcast 推送。
//! 用于测试与离线演示；`set_offline(true)` 可模拟连接失败。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::Rng;
use shared::message::TableChange;
use shared::models::{Table, TableCreate, TableId, TablePatch};
use tokio::sync::{broadcast, watch};

use super::{
    AuthBackend, CHANGE_CHANNEL_CAPACITY, PresenceBackend, PresenceRegistry, TableBackend, User,
};
use crate::{ClientError, ClientResult};

/// In-memory table collection and auth provider
#[derive(Debug)]
pub struct MemoryBackend {
    tables: DashMap<TableId, Table>,
    next_id: AtomicI64,
    version: AtomicU64,
    changes: broadcast::Sender<TableChange>,
    /// 是否向订阅者推送
    publishing: AtomicBool,
    offline: AtomicBool,
    /// email -> 待验证的登录码
    codes: DashMap<String, String>,
    admins: RwLock<HashSet<String>>,
    current_user: RwLock<Option<User>>,
    presence: PresenceRegistry,
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: DashMap::new(),
            next_id: AtomicI64::new(1),
            version: AtomicU64::new(0),
            changes,
            publishing: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            codes: DashMap::new(),
            admins: RwLock::new(HashSet::new()),
            current_user: RwLock::new(None),
            presence: PresenceRegistry::default(),
        }
    }

    /// Insert tables directly, without notifications
    pub fn seed(&self, tables: impl IntoIterator<Item = TableCreate>) -> Vec<Table> {
        tables
            .into_iter()
            .map(|data| {
                let table = Table::from_create(self.allocate_id(), data);
                self.tables.insert(table.id.clone(), table.clone());
                table
            })
            .collect()
    }

    /// Users signing in with this e-mail get the `admin` role claim
    pub fn with_admin(self, email: impl Into<String>) -> Self {
        self.admins.write().insert(email.into());
        self
    }

    /// Issue a six-digit login code for `email`, as the mail step would
    pub fn issue_code(&self, email: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        self.codes.insert(email.to_string(), code.clone());
        code
    }

    /// Simulate a lost connection
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn allocate_id(&self) -> TableId {
        TableId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn ensure_online(&self) -> ClientResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Backend("backend unreachable".into()));
        }
        Ok(())
    }

    fn publish(&self, change: impl FnOnce(u64) -> TableChange) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        if self.publishing.load(Ordering::SeqCst) {
            // 没有接收者时 send 返回 Err，忽略即可
            let _ = self.changes.send(change(version));
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TableBackend for MemoryBackend {
    async fn fetch_tables(&self) -> ClientResult<Vec<Table>> {
        self.ensure_online()?;
        let mut tables: Vec<Table> = self.tables.iter().map(|t| t.value().clone()).collect();
        tables.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
        Ok(tables)
    }

    async fn insert_table(&self, data: TableCreate) -> ClientResult<Table> {
        self.ensure_online()?;
        let table = Table::from_create(self.allocate_id(), data);
        self.tables.insert(table.id.clone(), table.clone());
        tracing::debug!(id = %table.id, name = %table.name, "Table inserted");
        self.publish(|version| TableChange::insert(version, table.clone()));
        Ok(table)
    }

    async fn update_table(&self, id: &TableId, patch: TablePatch) -> ClientResult<Table> {
        self.ensure_online()?;
        let updated = {
            let mut entry = self
                .tables
                .get_mut(id)
                .ok_or_else(|| ClientError::NotFound(format!("Table {}", id)))?;
            patch.apply_to(entry.value_mut());
            entry.value().clone()
        };
        self.publish(|version| TableChange::update(version, updated.clone()));
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.publishing.store(true, Ordering::SeqCst);
        self.changes.subscribe()
    }

    fn unsubscribe(&self) {
        self.publishing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn verify_magic_code(&self, email: &str, code: &str) -> ClientResult<User> {
        self.ensure_online()?;
        let matches = self
            .codes
            .get(email)
            .is_some_and(|expected| expected.value() == code);
        if !matches {
            tracing::warn!(email = %email, "Invalid magic code");
            return Err(ClientError::Unauthorized);
        }
        self.codes.remove(email);

        let role = self
            .admins
            .read()
            .contains(email)
            .then(|| "admin".to_string());
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            role,
        };
        *self.current_user.write() = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> ClientResult<()> {
        *self.current_user.write() = None;
        Ok(())
    }

    fn current_user(&self) -> Option<User> {
        self.current_user.read().clone()
    }
}

impl PresenceBackend for MemoryBackend {
    fn track_presence(&self, key: &str) -> watch::Receiver<usize> {
        let rx = self.presence.track(key);
        tracing::debug!(key = %key, online = *rx.borrow(), "Presence tracked");
        rx
    }

    fn untrack_presence(&self, key: &str) {
        self.presence.untrack(key);
        tracing::debug!(key = %key, online = self.presence.online(), "Presence left");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::ChangeAction;

    #[tokio::test]
    async fn test_fetch_orders_by_index() {
        let backend = MemoryBackend::new();
        backend.seed([
            TableCreate::new(3, "Drei"),
            TableCreate::new(1, "Eins"),
            TableCreate::new(2, "Zwei"),
        ]);
        let names: Vec<String> = backend
            .fetch_tables()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Eins", "Zwei", "Drei"]);
    }

    #[tokio::test]
    async fn test_changes_only_while_subscribed() {
        let backend = MemoryBackend::new();
        let tables = backend.seed([TableCreate::new(1, "Eins")]);
        let id = tables[0].id.clone();

        let mut rx = backend.subscribe();
        backend
            .update_table(&id, TablePatch::lock("_editor01", 5))
            .await
            .unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.action, ChangeAction::Update);
        assert_eq!(change.table.locked_by.as_deref(), Some("_editor01"));

        backend.unsubscribe();
        backend.insert_table(TableCreate::new(2, "Zwei")).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_unknown_table() {
        let backend = MemoryBackend::new();
        let err = backend
            .update_table(&TableId::from(42), TablePatch::unlock())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_magic_code_login() {
        let backend = MemoryBackend::new().with_admin("chef@example.com");
        assert!(backend.verify_magic_code("chef@example.com", "000000").await.is_err());

        let code = backend.issue_code("chef@example.com");
        let user = backend.verify_magic_code("chef@example.com", &code).await.unwrap();
        assert!(user.is_admin());
        assert_eq!(backend.current_user(), Some(user));

        // 登录码只能使用一次
        assert!(backend.verify_magic_code("chef@example.com", &code).await.is_err());

        backend.sign_out().await.unwrap();
        assert_eq!(backend.current_user(), None);
    }

    #[tokio::test]
    async fn test_offline() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(
            backend.fetch_tables().await,
            Err(ClientError::Backend(_))
        ));
        backend.set_offline(false);
        assert!(backend.fetch_tables().await.unwrap().is_empty());
    }

    #[test]
    fn test_presence_shared_between_clients() {
        let backend = MemoryBackend::new();
        let first = backend.track_presence("_aaaaaaaa");
        let second = backend.track_presence("_bbbbbbbb");
        assert_eq!(*first.borrow(), 2);
        assert_eq!(*second.borrow(), 2);

        backend.untrack_presence("_bbbbbbbb");
        assert_eq!(*first.borrow(), 1);
    }
}
