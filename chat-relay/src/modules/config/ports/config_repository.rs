// Config Repository Port

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::modules::config::domain::AppConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// 读写配置文件失败
    #[error("Cannot access config at {path}: {source}")]
    StorageError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件不是合法的 JSON 文档
    #[error("Malformed config document: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 合并环境变量后的配置未通过校验
    #[error("Invalid configuration: {}", errors.join("; "))]
    ValidationError { errors: Vec<String> },
}

impl ConfigError {
    pub fn storage(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ConfigError::StorageError { path, source }
    }
}

/// 应用配置的持久化端口
///
/// 实现方在没有已保存配置时返回 `AppConfig::default()`，而不是报错
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    /// 是否已经保存过配置
    async fn exists(&self) -> Result<bool, ConfigError>;
}
