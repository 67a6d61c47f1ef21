use serde::{Deserialize, Serialize};

/// 流式输出块（推送给输出端的单个 token）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageChunk {
    pub session_id: String,
    pub content: String,
}

/// 完整消息（生成结束或非流式模式时推送）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub session_id: String,
    pub author: String,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(
        session_id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            author: author.into(),
            content: content.into(),
        }
    }
}
