// File Config Repository
//
// 基于 JSON 文件的配置仓储实现

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::modules::config::domain::AppConfig;
use crate::modules::config::ports::{ConfigError, ConfigRepository};

/// 默认配置文件名
pub const CONFIG_FILE_NAME: &str = "config.json";

/// 文件配置仓储
///
/// 文件不存在时返回默认配置，首次保存时才会创建文件。
pub struct FileConfigRepository {
    path: PathBuf,
}

impl FileConfigRepository {
    /// 在数据目录下使用 `config.json`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CONFIG_FILE_NAME),
        }
    }

    /// 使用指定的配置文件路径
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigRepository for FileConfigRepository {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(ConfigError::storage(&self.path))?
        {
            debug!("Config file {} not found, using defaults", self.path.display());
            return Ok(AppConfig::default());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(ConfigError::storage(&self.path))?;
        let config: AppConfig = serde_json::from_str(&content)?;

        info!("Loaded config from {}", self.path.display());
        Ok(config)
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ConfigError::storage(parent))?;
        }

        let content = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(ConfigError::storage(&self.path))?;

        debug!("Saved config to {}", self.path.display());
        Ok(())
    }

    async fn exists(&self) -> Result<bool, ConfigError> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(ConfigError::storage(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let repo = FileConfigRepository::new(dir.path());

        let config = repo.load().await.unwrap();
        assert_eq!(config.chat.assistant_name, "Answer");
        assert!(!repo.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let repo = FileConfigRepository::new(dir.path().join("nested"));

        let mut config = AppConfig::default();
        config.chat.system_prompt = "Be brief.".to_string();
        repo.save(&config).await.unwrap();

        let reopened = FileConfigRepository::new(dir.path().join("nested"));
        assert_eq!(reopened.load().await.unwrap().chat.system_prompt, "Be brief.");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();

        let repo = FileConfigRepository::new(dir.path());
        assert!(matches!(
            repo.load().await,
            Err(ConfigError::SerializationError(_))
        ));
    }
}
