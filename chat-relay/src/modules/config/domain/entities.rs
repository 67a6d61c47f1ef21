// Config Domain Entities
//
// 配置领域实体定义

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::value_objects::{ProviderType, StorageBackend};

/// LLM 提供商配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    /// 离线模式下提供的模型列表
    pub scripted_models: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::OpenAI,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
            scripted_models: vec!["scripted-model".to_string()],
        }
    }
}

/// 线程存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// 文件后端的数据目录，未设置时使用启动参数指定的目录
    pub data_dir: Option<PathBuf>,
    /// 启动时写入演示线程
    pub seed_demo_threads: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: None,
            seed_demo_threads: true,
        }
    }
}

/// 聊天会话配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub assistant_name: String,
    pub default_stream: bool,
    pub default_temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            assistant_name: "Answer".to_string(),
            default_stream: true,
            default_temperature: 1.0,
        }
    }
}

/// 演示认证配置（字面比较，不是真正的认证）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// 持久化用户记录使用的 ID
    pub user_id: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
            user_id: "test".to_string(),
        }
    }
}

/// 应用配置聚合根
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub storage: StorageConfig,
    pub chat: ChatConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// 创建新的默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 验证配置是否有效
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(0.0..=2.0).contains(&self.chat.default_temperature) {
            errors.push("Default temperature must be between 0 and 2".to_string());
        }
        if self.chat.system_prompt.trim().is_empty() {
            errors.push("System prompt must not be empty".to_string());
        }
        if self.provider.timeout_secs == 0 {
            errors.push("Provider timeout must be greater than 0".to_string());
        }
        if self.provider.provider_type == ProviderType::OpenAI
            && self.provider.base_url.trim().is_empty()
        {
            errors.push("Provider base URL must not be empty".to_string());
        }
        if self.provider.provider_type == ProviderType::Scripted
            && self.provider.scripted_models.is_empty()
        {
            errors.push("Scripted provider needs at least one model".to_string());
        }
        if self.auth.username.is_empty() {
            errors.push("Auth username must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
