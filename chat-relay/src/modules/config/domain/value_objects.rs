// Config Value Objects
//
// 配置相关的值对象定义

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// LLM 提供商类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// OpenAI 兼容 HTTP 接口
    #[default]
    OpenAI,
    /// 本地预设回复（离线 / 测试）
    Scripted,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Scripted => "scripted",
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "scripted" | "offline" => Ok(ProviderType::Scripted),
            other => Err(format!("unknown provider type: {}", other)),
        }
    }
}

/// 线程存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存，重启即丢失
    #[default]
    Memory,
    /// JSON 文件
    File,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" => Ok(StorageBackend::File),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_from_str() {
        assert_eq!("FILE".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_provider_type_round_trip() {
        let json = serde_json::to_string(&ProviderType::Scripted).unwrap();
        assert_eq!(json, "\"scripted\"");
        assert_eq!("offline".parse::<ProviderType>(), Ok(ProviderType::Scripted));
        assert!("anthropic".parse::<ProviderType>().is_err());
    }
}
