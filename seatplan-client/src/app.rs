//! SeatingApp - 应用上下文组装
//!
//! 把配置、后端、store、提示队列、发布时间检查和本机 editor id
//! 组装在一起，替代全局单例。

use std::sync::Arc;
use std::time::Duration;

use shared::models::TableId;

use crate::backend::{Backend, MemoryBackend, RestBackend, User};
use crate::gate::LoginGateClient;
use crate::helper::create_editor_id;
use crate::lock::EditSession;
use crate::store::TableStore;
use crate::timeout::ReleaseGate;
use crate::toast::Toasts;
use crate::{BackendKind, ClientConfig, ClientResult};

/// Application context for one client
#[derive(Debug)]
pub struct SeatingApp {
    config: ClientConfig,
    store: TableStore,
    toasts: Toasts,
    release: ReleaseGate,
    gate: LoginGateClient,
    /// 本次会话的临时 editor id (锁持有者标识)
    editor_id: String,
}

impl SeatingApp {
    /// Assemble the context around an existing backend
    pub fn new(config: ClientConfig, backend: Arc<dyn Backend>) -> ClientResult<Self> {
        let toasts = Toasts::new();
        let store = TableStore::new(backend, toasts.clone());
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        let release = ReleaseGate::new(config.release_time, http);
        let gate = LoginGateClient::new(&config)?;
        let editor_id = create_editor_id();

        tracing::info!(app = %config.app_name, editor_id = %editor_id, "Seating app created");

        Ok(Self {
            config,
            store,
            toasts,
            release,
            gate,
            editor_id,
        })
    }

    /// Pick the backend from the configuration
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        let backend: Arc<dyn Backend> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::Rest => Arc::new(RestBackend::new(&config)?),
        };
        Self::new(config, backend)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn release(&self) -> &ReleaseGate {
        &self.release
    }

    pub fn editor_id(&self) -> &str {
        &self.editor_id
    }

    /// Load tables, subscribe to changes and check the release time
    ///
    /// 首次加载或时间服务失败都不影响启动：加载失败已提示，
    /// 实时订阅会补上之后的变更；时间服务失败只是不做时钟修正。
    pub async fn start(&self) {
        self.store.restore_session();
        if let Err(e) = self.store.fetch_entries().await {
            tracing::warn!(error = %e, "Initial table load failed, starting anyway");
        }
        self.store.realtime_subscribe();
        self.store.presence_subscribe(&self.editor_id);

        match &self.config.time_url {
            Some(url) => {
                if let Err(e) = self.release.fetch_time(url).await {
                    tracing::warn!(error = %e, "Release check without clock correction");
                    self.release.start_polling();
                }
            }
            None => self.release.start_polling(),
        }
    }

    /// Tear down background tasks
    pub fn stop(&self) {
        self.store.realtime_unsubscribe();
        self.store.presence_unsubscribe();
        self.release.clear_release_interval();
    }

    /// Open an edit session on a table with this client's editor id
    pub async fn edit(&self, table_id: TableId) -> ClientResult<EditSession> {
        EditSession::begin(&self.store, table_id, self.editor_id.clone()).await
    }

    /// Release another editor's lock (signed-in users only)
    pub async fn unlock(&self, table_id: &TableId) -> ClientResult<()> {
        self.store.force_unlock(table_id, &self.editor_id).await?;
        Ok(())
    }

    /// Step 1 of the login: ask the gate to mail a code
    pub async fn request_login_code(&self, email: &str) -> ClientResult<()> {
        self.gate.request_login_code(email).await.inspect_err(|e| {
            self.toasts.error(e.user_message());
        })
    }

    /// Step 2 of the login: exchange the code
    pub async fn sign_in(&self, email: &str, code: &str) -> ClientResult<User> {
        let user = self.store.sign_in(email, code).await?;
        self.toasts.success("Angemeldet");
        Ok(user)
    }

    pub async fn sign_out(&self) -> ClientResult<()> {
        self.store.sign_out().await
    }
}

impl Drop for SeatingApp {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::TableCreate;

    #[tokio::test]
    async fn test_memory_app_starts() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed([TableCreate::new(1, "Tisch 1")]);
        let app = SeatingApp::new(ClientConfig::default(), backend).unwrap();

        app.start().await;
        assert_eq!(app.store().tables().len(), 1);
        assert!(app.store().is_subscribed());
        assert_eq!(app.store().users_online(), 1);
        // 未配置发布时间：立即可用
        assert!(app.release().is_released());
        assert!(app.editor_id().starts_with('_'));

        app.stop();
        assert!(!app.store().is_subscribed());
        assert_eq!(app.store().users_online(), 0);
    }

    #[tokio::test]
    async fn test_start_survives_failed_load() {
        let backend = Arc::new(MemoryBackend::new());
        backend.seed([TableCreate::new(1, "Tisch 1")]);
        backend.set_offline(true);
        let app = SeatingApp::new(ClientConfig::default(), backend.clone()).unwrap();

        app.start().await;
        assert!(app.store().tables().is_empty());
        assert_eq!(app.toasts().list().len(), 1);
        // 实时订阅和发布检查照常启动
        assert!(app.store().is_subscribed());
        assert!(app.release().is_released());

        backend.set_offline(false);
        app.store().fetch_entries().await.unwrap();
        assert_eq!(app.store().tables().len(), 1);
    }

    #[tokio::test]
    async fn test_from_config_rest_requires_url() {
        let config = ClientConfig {
            backend: BackendKind::Rest,
            ..ClientConfig::default()
        };
        assert!(SeatingApp::from_config(config).is_err());
    }

    #[tokio::test]
    async fn test_edit_uses_editor_id() {
        let backend = Arc::new(MemoryBackend::new());
        let tables = backend.seed([TableCreate::new(1, "Tisch 1")]);
        let app = SeatingApp::new(ClientConfig::default(), backend).unwrap();
        app.start().await;

        let session = app.edit(tables[0].id.clone()).await.unwrap();
        assert_eq!(session.editor_id(), app.editor_id());
        session.cancel().await.unwrap();
    }
}
