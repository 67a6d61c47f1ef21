use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::modules::chat::{ChatOutputPort, ChatSettings};
use crate::shared::{MessageChunk, OutboundMessage};

/// 事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub enum AppEvent {
    /// 流式 token
    MessageChunk(MessageChunk),
    /// 完整消息（生成结束、非流式回复或欢迎消息）
    MessageComplete(OutboundMessage),
    MessageError {
        session_id: String,
        error: String,
    },
    SettingsUpdated {
        session_id: String,
        settings: ChatSettings,
    },
}

impl AppEvent {
    pub fn session_id(&self) -> &str {
        match self {
            AppEvent::MessageChunk(chunk) => &chunk.session_id,
            AppEvent::MessageComplete(message) => &message.session_id,
            AppEvent::MessageError { session_id, .. } => session_id,
            AppEvent::SettingsUpdated { session_id, .. } => session_id,
        }
    }
}

/// 进程内事件总线
///
/// 会话通过 `ChatOutputPort` 推送输出，宿主订阅后渲染
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: AppEvent) {
        match &event {
            AppEvent::MessageChunk(_) => {}
            AppEvent::MessageError { error, .. } => {
                tracing::error!("[EventBus] Publishing message error: {}", error)
            }
            other => tracing::debug!("[EventBus] Publishing event: {:?}", other),
        }
        // 没有订阅者时丢弃
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatOutputPort for EventBus {
    async fn deliver_token(&self, session_id: &str, token: &str) {
        self.publish(AppEvent::MessageChunk(MessageChunk {
            session_id: session_id.to_string(),
            content: token.to_string(),
        }));
    }

    async fn deliver_message(&self, session_id: &str, author: &str, content: &str) {
        self.publish(AppEvent::MessageComplete(OutboundMessage::new(
            session_id, author, content,
        )));
    }

    async fn deliver_error(&self, session_id: &str, error: &str) {
        self.publish(AppEvent::MessageError {
            session_id: session_id.to_string(),
            error: error.to_string(),
        });
    }
}
