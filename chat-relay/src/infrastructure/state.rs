use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::EventBus;
use crate::modules::auth::{Authenticator, PasswordAuthenticator};
use crate::modules::chat::{build_llm_adapter, ChatModule, SessionCanceller, User};
use crate::modules::config::AppConfig;
use crate::shared::{AppError, AppResult};

/// 应用全局状态
///
/// 进程启动时构造一次，持有所有模块与共享设施
pub struct AppState {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub chat: Arc<ChatModule>,
    pub event_bus: Arc<EventBus>,
    pub authenticator: Arc<dyn Authenticator>,
    /// 进行中的生成（用于取消操作）
    active_generations: Arc<RwLock<HashMap<String, SessionCanceller>>>,
}

impl AppState {
    /// 根据配置组装所有模块
    pub async fn initialize(config: AppConfig, data_dir: &Path) -> AppResult<Self> {
        let llm = build_llm_adapter(&config.provider)?;
        let chat = ChatModule::from_config(&config, data_dir, llm).await?;
        let authenticator = PasswordAuthenticator::from_config(&config.auth);

        tracing::info!("Application state initialized, data dir: {}", data_dir.display());

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            chat: Arc::new(chat),
            event_bus: Arc::new(EventBus::new()),
            authenticator: Arc::new(authenticator),
            active_generations: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// 认证用户，拒绝时返回 `AuthRejected`
    pub async fn login(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self
            .authenticator
            .authenticate(username, password)
            .await
            .ok_or_else(|| AppError::AuthRejected(username.to_string()))?;
        self.chat.create_user(user.clone()).await?;
        Ok(user)
    }

    pub async fn register_generation(&self, session_id: &str, canceller: SessionCanceller) {
        let mut active = self.active_generations.write().await;
        active.insert(session_id.to_string(), canceller);
    }

    pub async fn finish_generation(&self, session_id: &str) {
        let mut active = self.active_generations.write().await;
        active.remove(session_id);
    }

    /// 取消进行中的生成，返回是否找到对应会话
    pub async fn cancel_generation(&self, session_id: &str) -> bool {
        let active = self.active_generations.read().await;
        match active.get(session_id) {
            Some(canceller) => {
                canceller.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::config::ProviderType;
    use tempfile::TempDir;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.provider.provider_type = ProviderType::Scripted;
        config
    }

    #[tokio::test]
    async fn test_login() {
        let dir = TempDir::new().unwrap();
        let state = AppState::initialize(offline_config(), dir.path()).await.unwrap();

        let user = state.login("admin", "admin").await.unwrap();
        assert_eq!(user.identifier, "admin");

        let rejected = state.login("admin", "nope").await;
        assert!(matches!(rejected, Err(AppError::AuthRejected(_))));
    }

    #[tokio::test]
    async fn test_cancel_unknown_generation() {
        let dir = TempDir::new().unwrap();
        let state = AppState::initialize(offline_config(), dir.path()).await.unwrap();

        assert!(!state.cancel_generation("missing").await);
    }
}
