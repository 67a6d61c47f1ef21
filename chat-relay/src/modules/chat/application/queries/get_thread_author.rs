use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, QueryHandler};
use crate::modules::chat::domain::ThreadId;
use crate::modules::chat::ports::ThreadRepository;

/// 获取线程作者查询
#[derive(Debug, Clone)]
pub struct GetThreadAuthorQuery {
    pub thread_id: ThreadId,
}

impl GetThreadAuthorQuery {
    pub fn new(thread_id: impl Into<ThreadId>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}

/// 获取线程作者查询处理器
///
/// 返回线程所有者的标识；线程不存在时返回唯一的已知用户
pub struct GetThreadAuthorHandler {
    thread_repository: Arc<dyn ThreadRepository>,
    default_identifier: String,
}

impl GetThreadAuthorHandler {
    pub fn new(
        thread_repository: Arc<dyn ThreadRepository>,
        default_identifier: impl Into<String>,
    ) -> Self {
        Self {
            thread_repository,
            default_identifier: default_identifier.into(),
        }
    }
}

#[async_trait]
impl QueryHandler<GetThreadAuthorQuery, String> for GetThreadAuthorHandler {
    async fn handle(&self, query: GetThreadAuthorQuery) -> Result<String, ApplicationError> {
        let thread = self.thread_repository.get(&query.thread_id).await?;
        Ok(thread
            .map(|t| t.user().identifier.clone())
            .unwrap_or_else(|| self.default_identifier.clone()))
    }
}
