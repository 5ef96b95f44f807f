//! Table edit locking
//!
//! 加锁流程：
//!
//! ```text
//! begin() ──▶ PATCH locked_by/locked_at ──▶ EditTimer (4 min)
//!    │                                          │
//!    ├── save(patch)  ──▶ PATCH 数据 + 清除锁 ──┤ clear_timer
//!    ├── cancel()     ──▶ PATCH 清除锁 ─────────┤ clear_timer
//!    └── 超时          ──▶ PATCH 清除锁 (会话失效)
//! ```
//!
//! 锁只是协作约定：后端不做仲裁，后写入者覆盖先写入者。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shared::models::{Table, TableId, TablePatch};

use crate::helper::now_ms;
use crate::store::TableStore;
use crate::timeout::EditTimer;
use crate::{ClientError, ClientResult};

pub use crate::timeout::EDIT_TIMEOUT;

/// Whether `editor_id` may open the edit form of `table`
///
/// 未加锁时任何人可编辑；加锁后只有持有者可以。
/// 登录用户要覆盖他人的锁，必须先显式解锁 ([`can_unlock`])。
pub fn can_edit(table: &Table, editor_id: &str) -> bool {
    let state = table.lock_state();
    !state.is_locked() || state.is_held_by(editor_id)
}

/// Whether the manual unlock action is offered for `table`
///
/// 只对已登录用户、且锁由其他编辑者持有时可用；自己的锁不能强制解锁。
pub fn can_unlock(table: &Table, editor_id: &str, authenticated: bool) -> bool {
    let state = table.lock_state();
    authenticated && state.is_locked() && !state.is_held_by(editor_id)
}

/// One open edit form holding the table lock
#[derive(Debug)]
pub struct EditSession {
    store: TableStore,
    table_id: TableId,
    editor_id: String,
    timer: EditTimer,
    /// 锁仍由本会话持有 (未保存、未取消、未超时)
    active: Arc<AtomicBool>,
}

impl EditSession {
    /// Lock the table for `editor_id` and start the countdown
    pub async fn begin(
        store: &TableStore,
        table_id: TableId,
        editor_id: impl Into<String>,
    ) -> ClientResult<Self> {
        let editor_id = editor_id.into();
        let table = store
            .table(&table_id)
            .ok_or_else(|| ClientError::NotFound(format!("Table {}", table_id)))?;
        if !can_edit(&table, &editor_id) {
            tracing::info!(id = %table_id, "Table is locked by another editor");
            return Err(ClientError::Locked(table_id.to_string()));
        }

        store
            .update_entry(&table_id, TablePatch::lock(editor_id.clone(), now_ms()))
            .await?;
        tracing::debug!(id = %table_id, editor = %editor_id, "Table locked");

        let session = Self {
            store: store.clone(),
            table_id,
            editor_id,
            timer: EditTimer::new(),
            active: Arc::new(AtomicBool::new(true)),
        };
        session.start_timer();
        Ok(session)
    }

    fn start_timer(&self) {
        let store = self.store.clone();
        let id = self.table_id.clone();
        let active = self.active.clone();
        self.timer.set_timer(async move {
            if !active.swap(false, Ordering::SeqCst) {
                return;
            }
            tracing::info!(id = %id, "Edit timed out, releasing lock");
            // 失败时 store 已记录日志并提示
            let _ = store.update_entry(&id, TablePatch::unlock()).await;
        });
    }

    pub fn table_id(&self) -> &TableId {
        &self.table_id
    }

    pub fn editor_id(&self) -> &str {
        &self.editor_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Remaining seconds
    pub fn countdown(&self) -> u64 {
        self.timer.countdown()
    }

    pub fn countdown_to_time(&self) -> String {
        self.timer.countdown_to_time()
    }

    /// Write the edit and release the lock in the same request
    ///
    /// 保存失败时会话保持有效，可以重试。
    pub async fn save(&self, mut patch: TablePatch) -> ClientResult<Table> {
        if !self.is_active() {
            return Err(ClientError::SessionExpired);
        }
        patch.locked_by = Some(None);
        patch.locked_at = Some(None);

        let table = self.store.update_entry(&self.table_id, patch).await?;
        self.finish();
        Ok(table)
    }

    /// Release the lock without writing anything else
    ///
    /// 写入失败时会话和倒计时保持不变，可以重试，超时也仍会释放。
    pub async fn cancel(&self) -> ClientResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        self.store
            .update_entry(&self.table_id, TablePatch::unlock())
            .await?;
        self.finish();
        Ok(())
    }

    fn finish(&self) {
        self.timer.clear_timer();
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        // 被丢弃但仍持有锁：在后台释放
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.timer.clear_timer();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let store = self.store.clone();
            let id = self.table_id.clone();
            handle.spawn(async move {
                let _ = store.update_entry(&id, TablePatch::unlock()).await;
            });
        }
    }
}
