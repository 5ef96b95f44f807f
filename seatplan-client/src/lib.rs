//! Seatplan Client - 座位预订客户端核心
//!
//! # 模块结构
//!
//! ```text
//! seatplan-client/src/
//! ├── backend/       # 后端能力抽象 (查询/订阅/写入/认证/在线人数) 及实现
//! │   ├── memory.rs  # 同进程实现 (测试/离线)
//! │   └── rest.rs    # PostgREST 风格 HTTP 实现
//! ├── config.rs      # 环境变量配置
//! ├── store.rs       # 桌台状态 (显式构造的应用上下文)
//! ├── lock.rs        # 编辑锁流程 (加锁、倒计时、释放)
//! ├── validation.rs  # 表单校验、重名/相似姓名检测
//! ├── similarity.rs  # bigram 相似度
//! ├── timeout.rs     # 编辑倒计时、时钟偏差与发布时间
//! ├── toast.rs       # 提示消息
//! ├── search.rs      # 搜索与高亮区间
//! ├── helper.rs      # 日期格式化、editor id
//! ├── gate.rs        # 登录网关客户端
//! └── app.rs         # SeatingApp 组装
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod helper;
pub mod lock;
pub mod logger;
pub mod search;
pub mod similarity;
pub mod store;
pub mod timeout;
pub mod toast;
pub mod validation;

pub use app::SeatingApp;
pub use backend::{
    AuthBackend, Backend, MemoryBackend, PresenceBackend, RestBackend, TableBackend, User,
};
pub use config::{BackendKind, ClientConfig};
pub use error::{ClientError, ClientResult};
pub use gate::LoginGateClient;
pub use lock::{EditSession, can_edit, can_unlock};
pub use search::{find_matches, search_tables};
pub use similarity::{SIMILARITY_LIMIT, compare_two_strings};
pub use store::{SeatLimits, TableStore};
pub use timeout::{EDIT_TIMEOUT, EditTimer, ReleaseGate, ServerTime};
pub use toast::{Toast, ToastKind, Toasts};
pub use validation::{FieldError, FormState, ValidationErrors};

// Re-export shared types for convenience
pub use shared::models::{
    LockState, Reservation, SeatKey, Table, TableCreate, TableId, TablePatch,
};
pub use shared::message::{ChangeAction, TableChange};
