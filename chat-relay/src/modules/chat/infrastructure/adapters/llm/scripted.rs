// Scripted LLM Adapter
//
// 按预设片段回放输出的提供商，用于测试和离线模式

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::modules::chat::ports::{
    ChunkStream, CompletionRequest, CompletionResponse, FinishReason, LLMError, LLMPort,
    StreamChunk,
};

/// 一次预设回复
#[derive(Debug, Clone)]
enum ScriptedReply {
    /// 依次输出的片段
    Fragments(Vec<String>),
    /// 先输出片段，再返回网络错误
    FailAfter(Vec<String>),
}

/// 预设回复的 LLM 适配器
///
/// 回复按队列依次消费；队列为空时回显最后一条用户消息。
/// 同时记录收到的请求，便于断言。
pub struct ScriptedLLMAdapter {
    models: Vec<String>,
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    fragment_delay: Option<Duration>,
}

impl ScriptedLLMAdapter {
    pub fn new(models: Vec<String>) -> Self {
        Self {
            models,
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fragment_delay: None,
        }
    }

    /// 添加一条按片段输出的回复
    pub fn with_reply<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(ScriptedReply::Fragments(
            fragments.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// 添加一条中途失败的回复
    pub fn with_failure_after<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(ScriptedReply::FailAfter(
            fragments.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// 每个片段之间的延迟（模拟网络）
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = Some(delay);
        self
    }

    /// 已收到的请求
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn push(&self, reply: ScriptedReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    fn next_reply(&self, request: &CompletionRequest) -> ScriptedReply {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let queued = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        queued.unwrap_or_else(|| {
            let echo = request
                .messages
                .last()
                .map(|m| format!("You said: {}", m.content))
                .unwrap_or_default();
            ScriptedReply::Fragments(vec![echo])
        })
    }
}

impl Default for ScriptedLLMAdapter {
    fn default() -> Self {
        Self::new(vec!["scripted-model".to_string()])
    }
}

#[async_trait]
impl LLMPort for ScriptedLLMAdapter {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn list_models(&self) -> Result<Vec<String>, LLMError> {
        Ok(self.models.clone())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        match self.next_reply(&request) {
            ScriptedReply::Fragments(fragments) => Ok(CompletionResponse {
                content: fragments.concat(),
                finish_reason: FinishReason::Stop,
                usage: None,
            }),
            ScriptedReply::FailAfter(_) => Err(LLMError::NetworkError(
                "scripted connection reset".to_string(),
            )),
        }
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ChunkStream, LLMError> {
        let (fragments, fail) = match self.next_reply(&request) {
            ScriptedReply::Fragments(fragments) => (fragments, false),
            ScriptedReply::FailAfter(fragments) => (fragments, true),
        };

        let mut items: Vec<Result<StreamChunk, LLMError>> =
            fragments.into_iter().map(|f| Ok(StreamChunk::text(f))).collect();
        if fail {
            items.push(Err(LLMError::NetworkError(
                "scripted connection reset".to_string(),
            )));
        }

        let delay = self.fragment_delay;
        let stream = futures::stream::iter(items).then(move |item| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            item
        });

        Ok(Box::pin(stream))
    }
}
