use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, CommandHandler, StepQueue};
use crate::modules::chat::domain::{Step, StepId};

/// 记录步骤命令
#[derive(Debug, Clone)]
pub struct RecordStepCommand {
    pub step: Step,
}

impl RecordStepCommand {
    pub fn new(step: Step) -> Self {
        Self { step }
    }
}

/// 记录步骤响应
#[derive(Debug, Clone)]
pub struct RecordStepResponse {
    /// 本次写入仓储的步骤（为空表示仍在等待用户消息）
    pub committed: Vec<StepId>,
    /// 累计接收的步骤数
    pub ingested: u64,
}

/// 记录步骤命令处理器
pub struct RecordStepHandler {
    step_queue: Arc<StepQueue>,
}

impl RecordStepHandler {
    pub fn new(step_queue: Arc<StepQueue>) -> Self {
        Self { step_queue }
    }
}

#[async_trait]
impl CommandHandler<RecordStepCommand, RecordStepResponse> for RecordStepHandler {
    async fn handle(
        &self,
        command: RecordStepCommand,
    ) -> Result<RecordStepResponse, ApplicationError> {
        let committed = self.step_queue.record(command.step).await?;
        Ok(RecordStepResponse {
            committed,
            ingested: self.step_queue.ingested(),
        })
    }
}
