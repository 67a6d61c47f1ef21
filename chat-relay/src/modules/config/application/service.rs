// Config Service
//
// 配置服务门面：加载、环境变量覆盖、验证与保存

use std::sync::Arc;
use tracing::{debug, info};

use crate::modules::config::domain::{AppConfig, ProviderType, StorageBackend};
use crate::modules::config::ports::{ConfigError, ConfigRepository};

/// 环境变量名
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_STORAGE_BACKEND: &str = "CHAT_RELAY_STORAGE";
pub const ENV_PROVIDER_TYPE: &str = "CHAT_RELAY_PROVIDER";

/// 环境变量查询函数，测试时可替换
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// 配置服务实现
pub struct ConfigService {
    repository: Arc<dyn ConfigRepository>,
    env: EnvLookup,
}

impl ConfigService {
    /// 使用进程环境变量创建
    pub fn new(repository: Arc<dyn ConfigRepository>) -> Self {
        Self::with_env(repository, Arc::new(|key| std::env::var(key).ok()))
    }

    /// 使用自定义环境变量来源创建
    pub fn with_env(repository: Arc<dyn ConfigRepository>, env: EnvLookup) -> Self {
        Self { repository, env }
    }

    /// 获取仓储引用
    pub fn repository(&self) -> &Arc<dyn ConfigRepository> {
        &self.repository
    }

    /// 加载配置并应用环境变量覆盖，结果经过验证
    pub async fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = self.repository.load().await?;
        self.apply_env_overrides(&mut config)?;

        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError { errors })?;

        info!(
            "Configuration loaded: provider={}, storage={}",
            config.provider.provider_type.as_str(),
            config.storage.backend.as_str()
        );
        Ok(config)
    }

    /// 验证后保存
    pub async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError { errors })?;
        self.repository.save(config).await
    }

    /// 重置为默认配置
    pub async fn reset(&self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig::default();
        self.repository.save(&config).await?;
        info!("Configuration reset to defaults");
        Ok(config)
    }

    /// 配置是否已持久化
    pub async fn exists(&self) -> Result<bool, ConfigError> {
        self.repository.exists().await
    }

    fn apply_env_overrides(&self, config: &mut AppConfig) -> Result<(), ConfigError> {
        if let Some(key) = self.lookup(ENV_OPENAI_API_KEY) {
            debug!("Using API key from {}", ENV_OPENAI_API_KEY);
            config.provider.api_key = key;
        }
        if let Some(url) = self.lookup(ENV_OPENAI_BASE_URL) {
            debug!("Using base URL from {}: {}", ENV_OPENAI_BASE_URL, url);
            config.provider.base_url = url;
        }
        if let Some(provider) = self.lookup(ENV_PROVIDER_TYPE) {
            let parsed = provider.parse::<ProviderType>();
            config.provider.provider_type = parsed.map_err(|e| ConfigError::ValidationError {
                errors: vec![format!("{}: {}", ENV_PROVIDER_TYPE, e)],
            })?;
        }
        if let Some(backend) = self.lookup(ENV_STORAGE_BACKEND) {
            let parsed = backend.parse::<StorageBackend>();
            config.storage.backend = parsed.map_err(|e| ConfigError::ValidationError {
                errors: vec![format!("{}: {}", ENV_STORAGE_BACKEND, e)],
            })?;
        }
        Ok(())
    }

    /// 空字符串视为未设置
    fn lookup(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|v| !v.trim().is_empty())
    }
}
