// Config Module
//
// 配置管理模块，采用六边形架构
//
// 层次结构:
// - domain: 配置实体与值对象
// - ports: 配置读写的抽象接口
// - infrastructure: 内存与文件存储适配器
// - application: 配置服务（环境变量覆盖与验证）

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// 重新导出常用类型
pub use domain::{
    AppConfig, AuthConfig, ChatConfig, ProviderConfig, ProviderType, StorageBackend,
    StorageConfig,
};
pub use ports::{ConfigError, ConfigRepository};
pub use infrastructure::{FileConfigRepository, InMemoryConfigRepository, CONFIG_FILE_NAME};
pub use application::{
    ConfigService, EnvLookup, ENV_OPENAI_API_KEY, ENV_OPENAI_BASE_URL, ENV_PROVIDER_TYPE,
    ENV_STORAGE_BACKEND,
};

use std::path::PathBuf;
use std::sync::Arc;

/// Config 模块容器
pub struct ConfigModule {
    service: ConfigService,
}

impl ConfigModule {
    /// 使用内存仓储创建（用于测试）
    pub fn new_in_memory() -> Self {
        Self::with_repository(Arc::new(InMemoryConfigRepository::new()))
    }

    /// 使用数据目录下的 `config.json` 创建
    pub fn new_with_file(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        Self::with_repository(Arc::new(FileConfigRepository::new(data_dir)))
    }

    /// 使用自定义仓储创建
    pub fn with_repository(repository: Arc<dyn ConfigRepository>) -> Self {
        Self {
            service: ConfigService::new(repository),
        }
    }

    /// 获取配置服务
    pub fn service(&self) -> &ConfigService {
        &self.service
    }

    /// 加载生效配置
    pub async fn load(&self) -> Result<AppConfig, ConfigError> {
        self.service.load().await
    }

    /// 尚未保存过配置时写入默认配置，返回是否新建
    pub async fn init(&self) -> Result<bool, ConfigError> {
        if self.service.exists().await? {
            return Ok(false);
        }
        self.service.save(&AppConfig::default()).await?;
        Ok(true)
    }

    pub async fn reset(&self) -> Result<AppConfig, ConfigError> {
        self.service.reset().await
    }
}
