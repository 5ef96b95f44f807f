//! Backend capability set
//!
//! 客户端只依赖这里的 trait，不关心具体 BaaS：
//!
//! ```text
//! TableStore ──▶ Arc<dyn Backend>
//!                     │
//!        ┌────────────┴────────────┐
//!        ▼                         ▼
//!  MemoryBackend              RestBackend
//!  (同进程, 测试/离线)        (PostgREST 风格 HTTP)
//! ```
//!
//! 锁字段只是普通列，后端不做任何仲裁。
//! 在线人数通过 [`PresenceBackend`] 提供。

pub mod memory;
pub mod rest;

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::message::TableChange;
use shared::models::{Table, TableCreate, TableId, TablePatch};
use tokio::sync::{broadcast, watch};

use crate::ClientResult;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Broadcast capacity for change notifications
pub const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Optional role claim issued by the auth provider
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

/// Table collection capabilities
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// All tables, ordered by `index` ascending
    async fn fetch_tables(&self) -> ClientResult<Vec<Table>>;

    /// Insert a table; returns the stored record with its assigned id
    async fn insert_table(&self, data: TableCreate) -> ClientResult<Table>;

    /// Partial update; returns the record after the write
    async fn update_table(&self, id: &TableId, patch: TablePatch) -> ClientResult<Table>;

    /// Receive insert/update notifications
    ///
    /// 需要在 Tokio runtime 中调用 (REST 实现会启动轮询任务)。
    fn subscribe(&self) -> broadcast::Receiver<TableChange>;

    /// Stop producing notifications
    fn unsubscribe(&self);
}

/// Passwordless auth capabilities
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange an e-mailed magic code for a session
    async fn verify_magic_code(&self, email: &str, code: &str) -> ClientResult<User>;

    async fn sign_out(&self) -> ClientResult<()>;

    fn current_user(&self) -> Option<User>;
}

/// Online presence ("wer ist gerade da")
pub trait PresenceBackend: Send + Sync {
    /// Join the presence channel under `key`; the receiver yields the online count
    fn track_presence(&self, key: &str) -> watch::Receiver<usize>;

    /// Leave the presence channel; unknown keys are ignored
    fn untrack_presence(&self, key: &str);
}

/// Everything the store needs from a backend
pub trait Backend: TableBackend + AuthBackend + PresenceBackend {}

impl<T: TableBackend + AuthBackend + PresenceBackend> Backend for T {}

/// Set of tracked presence keys plus the published count
#[derive(Debug)]
pub struct PresenceRegistry {
    keys: Mutex<HashSet<String>>,
    count: watch::Sender<usize>,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self {
            keys: Mutex::new(HashSet::new()),
            count: watch::Sender::new(0),
        }
    }
}

impl PresenceRegistry {
    pub fn track(&self, key: &str) -> watch::Receiver<usize> {
        let mut keys = self.keys.lock();
        keys.insert(key.to_string());
        self.count.send_replace(keys.len());
        self.count.subscribe()
    }

    pub fn untrack(&self, key: &str) {
        let mut keys = self.keys.lock();
        if keys.remove(key) {
            self.count.send_replace(keys.len());
        }
    }

    pub fn online(&self) -> usize {
        *self.count.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role() {
        let user: User =
            serde_json::from_str(r#"{"id":"u1","email":"a@b.de","role":"admin"}"#).unwrap();
        assert!(user.is_admin());

        let user: User = serde_json::from_str(r#"{"id":"u2","email":"c@d.de"}"#).unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.role, None);
    }

    #[test]
    fn test_presence_registry_counts_keys() {
        let registry = PresenceRegistry::default();
        let rx = registry.track("_aaaaaaaa");
        registry.track("_bbbbbbbb");
        // 同一个 key 只算一次
        registry.track("_aaaaaaaa");
        assert_eq!(*rx.borrow(), 2);

        registry.untrack("_aaaaaaaa");
        registry.untrack("_unknown0");
        assert_eq!(*rx.borrow(), 1);
        assert_eq!(registry.online(), 1);
    }
}
