use serde::{Deserialize, Serialize};

use super::{StepType, Thread};

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// 系统提示
    System,
    /// 用户消息
    User,
    /// AI 助手消息
    Assistant,
}

impl MessageRole {
    /// 转换为 OpenAI 格式的角色名
    pub fn to_openai_role(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// 会话历史中的一条消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub content: String,
}

/// 会话历史
///
/// 只存在于内存中，随会话结束丢弃。第一条永远是系统提示，
/// 之后只追加，不重排。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistory {
    messages: Vec<HistoryMessage>,
}

impl SessionHistory {
    /// 以系统提示开始新的历史
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![HistoryMessage {
                role: MessageRole::System,
                content: system_prompt.into(),
            }],
        }
    }

    /// 从已存储的线程重建历史（只取用户与助手消息）
    pub fn replay(system_prompt: impl Into<String>, thread: &Thread) -> Self {
        let mut history = Self::new(system_prompt);
        for step in thread.steps() {
            match step.step_type() {
                StepType::UserMessage => history.push_user(step.output()),
                StepType::AssistantMessage => history.push_assistant(step.output()),
                StepType::Llm | StepType::Run => {}
            }
        }
        history
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(HistoryMessage {
            role: MessageRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(HistoryMessage {
            role: MessageRole::Assistant,
            content: content.into(),
        });
    }

    /// 撤销最后一条消息，系统提示不会被移除
    pub fn pop_last(&mut self) -> Option<HistoryMessage> {
        if self.messages.len() > 1 {
            self.messages.pop()
        } else {
            None
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    pub fn messages(&self) -> &[HistoryMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&HistoryMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// 历史至少包含系统提示，永远不为空
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::chat::domain::{PersistedUser, Step, ThreadId, ThreadMetadata};

    #[test]
    fn test_history_starts_with_system_prompt() {
        let history = SessionHistory::new("You are a helpful assistant.");
        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].role, MessageRole::System);
        assert_eq!(history.system_prompt(), "You are a helpful assistant.");
    }

    #[test]
    fn test_pop_never_removes_system_prompt() {
        let mut history = SessionHistory::new("sys");
        history.push_user("hi");

        assert!(history.pop_last().is_some());
        assert!(history.pop_last().is_none());
        assert_eq!(history.messages()[0].role, MessageRole::System);
    }

    #[test]
    fn test_replay_skips_non_message_steps() {
        let id = ThreadId::from("t1");
        let owner = PersistedUser::new("test", "admin", chrono::Utc::now());
        let thread = Thread::new(id.clone(), owner, ThreadMetadata::default()).with_steps([
            Step::user_message(id.clone(), "admin", "Message 1"),
            Step::new(
                crate::modules::chat::domain::StepId::new(),
                id.clone(),
                "llm",
                StepType::Llm,
                "ignored",
            ),
            Step::assistant_message(id, "Answer", "Message 2"),
        ]);

        let history = SessionHistory::replay("sys", &thread);
        let roles: Vec<MessageRole> = history.messages().iter().map(|m| m.role).collect();

        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        assert_eq!(history.messages()[2].content, "Message 2");
    }
}
