// In-Memory Config Repository

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::modules::config::domain::AppConfig;
use crate::modules::config::ports::{ConfigError, ConfigRepository};

/// 只存在于进程内的配置，测试与 `ConfigModule::new_in_memory` 使用
#[derive(Default)]
pub struct InMemoryConfigRepository {
    stored: RwLock<Option<AppConfig>>,
}

impl InMemoryConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一份已保存的配置
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            stored: RwLock::new(Some(config)),
        }
    }
}

#[async_trait]
impl ConfigRepository for InMemoryConfigRepository {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        Ok(self.stored.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.stored.write().await.replace(config.clone());
        Ok(())
    }

    async fn exists(&self) -> Result<bool, ConfigError> {
        Ok(self.stored.read().await.is_some())
    }
}
