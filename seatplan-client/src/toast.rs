//! Toast notifications
//!
//! 进程级提示队列 (可克隆句柄)。成功提示默认 2.4 秒后自动消失，
//! 其他类型保留到用户手动关闭。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// Default lifetime of a success toast
pub const SUCCESS_DURATION: Duration = Duration::from_millis(2400);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    /// None: stays until removed
    #[serde(with = "duration_ms")]
    pub duration: Option<Duration>,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }
}

#[derive(Debug, Default)]
struct ToastList {
    next_id: AtomicU64,
    items: Mutex<Vec<Toast>>,
}

/// Shared toast queue
#[derive(Debug, Clone, Default)]
pub struct Toasts {
    inner: Arc<ToastList>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a toast and return its id
    ///
    /// `duration` 为 None 时：success 使用 [`SUCCESS_DURATION`]，其他不自动消失。
    /// 有时长且处于 Tokio runtime 中时，到期自动移除。
    pub fn add_toast(
        &self,
        kind: ToastKind,
        message: impl Into<String>,
        duration: Option<Duration>,
    ) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let duration = duration.or(match kind {
            ToastKind::Success => Some(SUCCESS_DURATION),
            _ => None,
        });

        self.inner.items.lock().push(Toast {
            id,
            kind,
            message: message.into(),
            duration,
        });

        if let Some(duration) = duration
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            let toasts = self.clone();
            handle.spawn(async move {
                tokio::time::sleep(duration).await;
                toasts.remove_toast(id);
            });
        }

        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.add_toast(ToastKind::Success, message, None)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.add_toast(ToastKind::Error, message, None)
    }

    /// Remove a toast; unknown ids are ignored
    pub fn remove_toast(&self, id: u64) {
        let mut items = self.inner.items.lock();
        if let Some(pos) = items.iter().position(|t| t.id == id) {
            items.remove(pos);
        }
    }

    /// Snapshot of the current toasts, oldest first
    pub fn list(&self) -> Vec<Toast> {
        self.inner.items.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_durations() {
        let toasts = Toasts::new();
        let ok = toasts.success("Gespeichert");
        let err = toasts.error("Verbindung zum Server fehlgeschlagen.");
        let info = toasts.add_toast(ToastKind::Info, "Hinweis", Some(Duration::from_secs(5)));

        let list = toasts.list();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].id, ok);
        assert_eq!(list[0].duration, Some(SUCCESS_DURATION));
        assert_eq!(list[1].id, err);
        assert_eq!(list[1].duration, None);
        assert_eq!(list[2].id, info);
        assert_eq!(list[2].duration, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_remove_toast() {
        let toasts = Toasts::new();
        let a = toasts.error("a");
        let b = toasts.error("b");
        toasts.remove_toast(a);
        toasts.remove_toast(999);
        let ids: Vec<u64> = toasts.list().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_toast_expires() {
        let toasts = Toasts::new();
        toasts.success("Gespeichert");
        toasts.error("Fehler");

        tokio::time::sleep(Duration::from_millis(2500)).await;

        let list = toasts.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, ToastKind::Error);
    }

    #[test]
    fn test_serialize() {
        let toasts = Toasts::new();
        toasts.success("ok");
        let json = serde_json::to_value(&toasts.list()[0]).unwrap();
        assert_eq!(json["kind"], "success");
        assert_eq!(json["duration"], 2400);
    }
}
