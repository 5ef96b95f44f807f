//! Realtime change notifications
//!
//! 后端订阅推送的桌台变更。客户端按 id 合并，同一记录以最后一次更新为准。

use serde::{Deserialize, Serialize};

use crate::models::Table;

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    Insert,
    Update,
}

/// 桌台变更载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    pub action: ChangeAction,
    /// 单调递增的版本号 (每个后端实例独立计数)
    pub version: u64,
    /// 变更后的完整记录
    pub table: Table,
}

impl TableChange {
    pub fn insert(version: u64, table: Table) -> Self {
        Self {
            action: ChangeAction::Insert,
            version,
            table,
        }
    }

    pub fn update(version: u64, table: Table) -> Self {
        Self {
            action: ChangeAction::Update,
            version,
            table,
        }
    }
}
