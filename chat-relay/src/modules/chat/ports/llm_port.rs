use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

use crate::modules::chat::domain::HistoryMessage;

/// LLM 错误类型
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {code} - {message}")]
    ApiError { code: String, message: String },

    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitError { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// 聊天消息（发送给提供商的格式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&HistoryMessage> for LLMChatMessage {
    fn from(message: &HistoryMessage) -> Self {
        Self {
            role: message.role.to_openai_role().to_string(),
            content: message.content.clone(),
        }
    }
}

/// 补全请求
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// 消息历史
    pub messages: Vec<LLMChatMessage>,
    /// 模型 ID
    pub model: String,
    /// 温度参数 (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// 是否流式输出
    pub stream: bool,
    /// 最大生成 token 数
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<LLMChatMessage>, model: impl Into<String>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: None,
            stream: false,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// 补全响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Option<TokenUsage>,
}

/// 流式响应块
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChunk {
    /// 内容块（可能为空）
    pub content: String,
    /// 结束原因（最后一个块才有）
    pub finish_reason: Option<FinishReason>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: None,
        }
    }
}

/// 结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
}

impl FinishReason {
    /// 解析 OpenAI 风格的结束原因
    pub fn parse(reason: &str) -> Option<Self> {
        match reason {
            "stop" => Some(FinishReason::Stop),
            "length" => Some(FinishReason::Length),
            "content_filter" => Some(FinishReason::ContentFilter),
            "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
            _ => None,
        }
    }
}

/// Token 使用统计
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// 流式补全返回的增量片段序列
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>;

/// LLM 服务端口 - 核心抽象接口
///
/// 所有 LLM 提供商适配器都必须实现此 trait
#[async_trait]
pub trait LLMPort: Send + Sync {
    /// 获取提供商 ID
    fn provider_id(&self) -> &str;

    /// 获取可用模型 ID 列表（按提供商返回顺序）
    async fn list_models(&self) -> Result<Vec<String>, LLMError>;

    /// 单次补全请求
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError>;

    /// 流式补全请求
    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream, LLMError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_parse() {
        assert_eq!(FinishReason::parse("stop"), Some(FinishReason::Stop));
        assert_eq!(FinishReason::parse("tool_calls"), Some(FinishReason::ToolCalls));
        assert_eq!(FinishReason::parse("whatever"), None);
    }

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new(vec![], "gpt-4o")
            .with_temperature(0.5)
            .with_stream(true);

        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.temperature, Some(0.5));
        assert!(request.stream);
        assert!(request.max_tokens.is_none());
    }
}
