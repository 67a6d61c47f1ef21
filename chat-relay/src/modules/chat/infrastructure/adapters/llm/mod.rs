// LLM Adapters
// LLM 提供商适配器实现与工厂

mod openai;
mod scripted;

pub use openai::*;
pub use scripted::*;

use std::sync::Arc;
use tracing::info;

use crate::modules::chat::ports::{LLMError, LLMPort};
use crate::modules::config::{ProviderConfig, ProviderType};

/// 根据配置创建 LLM 适配器
pub fn build_llm_adapter(config: &ProviderConfig) -> Result<Arc<dyn LLMPort>, LLMError> {
    let adapter: Arc<dyn LLMPort> = match config.provider_type {
        ProviderType::OpenAI => Arc::new(OpenAIAdapter::new(OpenAIConfig {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })?),
        ProviderType::Scripted => {
            Arc::new(ScriptedLLMAdapter::new(config.scripted_models.clone()))
        }
    };

    info!("Using LLM provider: {}", adapter.provider_id());
    Ok(adapter)
}
