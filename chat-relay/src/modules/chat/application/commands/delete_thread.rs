use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::super::{ApplicationError, CommandHandler};
use crate::modules::chat::domain::ThreadId;
use crate::modules::chat::ports::ThreadRepository;

/// 删除线程命令
#[derive(Debug, Clone)]
pub struct DeleteThreadCommand {
    pub thread_id: ThreadId,
}

impl DeleteThreadCommand {
    pub fn new(thread_id: impl Into<ThreadId>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}

/// 删除线程命令响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteThreadResponse {
    /// 本次调用是否新增了删除标记（重复删除为 false）
    pub newly_deleted: bool,
}

/// 删除线程命令处理器
///
/// 软删除：只记录 ID，线程数据保留
pub struct DeleteThreadHandler {
    thread_repository: Arc<dyn ThreadRepository>,
}

impl DeleteThreadHandler {
    pub fn new(thread_repository: Arc<dyn ThreadRepository>) -> Self {
        Self { thread_repository }
    }
}

#[async_trait]
impl CommandHandler<DeleteThreadCommand, DeleteThreadResponse> for DeleteThreadHandler {
    async fn handle(
        &self,
        command: DeleteThreadCommand,
    ) -> Result<DeleteThreadResponse, ApplicationError> {
        let newly_deleted = self
            .thread_repository
            .mark_deleted(&command.thread_id)
            .await?;

        if newly_deleted {
            info!("Thread {} marked as deleted", command.thread_id);
        }

        Ok(DeleteThreadResponse { newly_deleted })
    }
}
