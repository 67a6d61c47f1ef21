use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::value_objects::{StepId, ThreadId};

/// 步骤类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// 用户输入
    UserMessage,
    /// 助手输出
    AssistantMessage,
    /// 一次 LLM 调用
    Llm,
    /// 其他运行步骤
    Run,
}

impl StepType {
    pub fn is_message(&self) -> bool {
        matches!(self, StepType::UserMessage | StepType::AssistantMessage)
    }
}

/// 步骤实体：线程中的一条消息事件，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    id: StepId,
    thread_id: ThreadId,
    name: String,
    #[serde(rename = "type")]
    step_type: StepType,
    output: String,
    created_at: DateTime<Utc>,
}

impl Step {
    /// 创建用户消息步骤
    pub fn user_message(
        thread_id: ThreadId,
        author: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::new(StepId::new(), thread_id, author, StepType::UserMessage, output)
    }

    /// 创建助手消息步骤
    pub fn assistant_message(
        thread_id: ThreadId,
        author: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::new(
            StepId::new(),
            thread_id,
            author,
            StepType::AssistantMessage,
            output,
        )
    }

    pub fn new(
        id: StepId,
        thread_id: ThreadId,
        name: impl Into<String>,
        step_type: StepType,
        output: impl Into<String>,
    ) -> Self {
        Self {
            id,
            thread_id,
            name: name.into(),
            step_type,
            output: output.into(),
            created_at: Utc::now(),
        }
    }

    /// 指定创建时间（用于种子数据和从存储恢复）
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    // Getters
    pub fn id(&self) -> &StepId {
        &self.id
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_type_wire_names() {
        let json = serde_json::to_string(&StepType::AssistantMessage).unwrap();
        assert_eq!(json, "\"assistant_message\"");
    }

    #[test]
    fn test_step_serializes_type_field() {
        let step = Step::user_message(ThreadId::from("t"), "admin", "Hi");
        let value = serde_json::to_value(&step).unwrap();

        assert_eq!(value["type"], "user_message");
        assert_eq!(value["threadId"], "t");
        assert_eq!(value["output"], "Hi");
    }
}
