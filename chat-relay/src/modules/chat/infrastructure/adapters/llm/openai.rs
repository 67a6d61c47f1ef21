use async_trait::async_trait;
use futures::{stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::modules::chat::ports::{
    ChunkStream, CompletionRequest, CompletionResponse, FinishReason, LLMError, LLMPort,
    StreamChunk, TokenUsage,
};

/// OpenAI 兼容接口配置
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

/// OpenAI API 适配器
///
/// 兼容任何实现了 `/models` 与 `/chat/completions` 的服务
pub struct OpenAIAdapter {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIAdapter {
    /// 创建新的 OpenAI 适配器
    pub fn new(config: OpenAIConfig) -> Result<Self, LLMError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 获取 API URL
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// 转换为 OpenAI 请求格式
    fn to_openai_request(request: &CompletionRequest, stream: bool) -> OpenAIRequest {
        OpenAIRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: Some(stream),
        }
    }

    /// 解析 SSE 行，`[DONE]` 与非 data 行返回 None
    fn parse_sse_line(line: &str) -> Option<OpenAIStreamResponse> {
        let data = line.trim().strip_prefix("data:")?.trim_start();
        if data == "[DONE]" {
            return None;
        }
        serde_json::from_str(data).ok()
    }

    /// 将 SSE 响应转换为流式块
    fn to_stream_chunk(response: OpenAIStreamResponse) -> Option<StreamChunk> {
        let choice = response.choices.into_iter().next()?;
        let finish_reason = choice.finish_reason.as_deref().and_then(FinishReason::parse);
        if choice.delta.content.is_none() && finish_reason.is_none() {
            return None;
        }
        Some(StreamChunk {
            content: choice.delta.content.unwrap_or_default(),
            finish_reason,
        })
    }

    /// 将非成功状态码映射为错误
    async fn error_from_response(response: reqwest::Response) -> LLMError {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("OpenAI API error: {} - {}", status, error_text);

        match status {
            StatusCode::UNAUTHORIZED => LLMError::AuthenticationError("Invalid API key".to_string()),
            StatusCode::NOT_FOUND => LLMError::ModelNotFound(error_text),
            StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimitError {
                retry_after_secs: 60,
            },
            _ => LLMError::ApiError {
                code: status.as_str().to_string(),
                message: error_text,
            },
        }
    }

    async fn post_completion(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LLMError> {
        let openai_request = Self::to_openai_request(request, stream);

        debug!(
            "Sending OpenAI completion request: model={}, stream={}, messages={}",
            openai_request.model,
            stream,
            openai_request.messages.len()
        );

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl LLMPort for OpenAIAdapter {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn list_models(&self) -> Result<Vec<String>, LLMError> {
        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let models: OpenAIModelList = response
            .json()
            .await
            .map_err(|e| LLMError::Unknown(e.to_string()))?;

        debug!("Provider returned {} models", models.data.len());
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let response = self.post_completion(&request, false).await?;

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Unknown(e.to_string()))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::Unknown("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .and_then(FinishReason::parse)
                .unwrap_or(FinishReason::Stop),
            usage: openai_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream, LLMError> {
        let response = self.post_completion(&request, true).await?;

        // 按字节缓冲，避免多字节字符或 SSE 行被网络分包截断
        let bytes_stream = Box::pin(response.bytes_stream());
        let buffer: Vec<u8> = Vec::new();
        let stream = stream::unfold(
            (bytes_stream, buffer),
            |(mut bytes_stream, mut buffer)| async move {
                loop {
                    // 先处理缓冲区中所有完整的行
                    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=pos).collect();
                        let line = String::from_utf8_lossy(&line);
                        if let Some(chunk) =
                            Self::parse_sse_line(&line).and_then(Self::to_stream_chunk)
                        {
                            return Some((Ok(chunk), (bytes_stream, buffer)));
                        }
                    }

                    match bytes_stream.next().await {
                        Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                        Some(Err(e)) => {
                            return Some((
                                Err(LLMError::NetworkError(e.to_string())),
                                (bytes_stream, buffer),
                            ));
                        }
                        None => {
                            // 末尾可能残留没有换行符的最后一行
                            if buffer.is_empty() {
                                return None;
                            }
                            let line = String::from_utf8_lossy(&buffer).into_owned();
                            buffer.clear();
                            return Self::parse_sse_line(&line)
                                .and_then(Self::to_stream_chunk)
                                .map(|chunk| (Ok(chunk), (bytes_stream, buffer)));
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}

// OpenAI API 类型定义

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamResponse {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModelList {
    data: Vec<OpenAIModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModel {
    id: String,
}
