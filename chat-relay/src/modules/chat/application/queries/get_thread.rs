use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, QueryHandler};
use crate::modules::chat::domain::{Thread, ThreadId};
use crate::modules::chat::ports::ThreadRepository;

/// 获取线程查询
#[derive(Debug, Clone)]
pub struct GetThreadQuery {
    pub thread_id: ThreadId,
}

impl GetThreadQuery {
    pub fn new(thread_id: impl Into<ThreadId>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}

/// 获取线程查询处理器
///
/// 按 ID 精确查找，软删除的线程同样可以取回；找不到时返回 `None`
pub struct GetThreadHandler {
    thread_repository: Arc<dyn ThreadRepository>,
}

impl GetThreadHandler {
    pub fn new(thread_repository: Arc<dyn ThreadRepository>) -> Self {
        Self { thread_repository }
    }
}

#[async_trait]
impl QueryHandler<GetThreadQuery, Option<Thread>> for GetThreadHandler {
    async fn handle(&self, query: GetThreadQuery) -> Result<Option<Thread>, ApplicationError> {
        Ok(self.thread_repository.get(&query.thread_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::chat::domain::PersistedUser;
    use crate::modules::chat::infrastructure::InMemoryThreadRepository;
    use chrono::Utc;

    #[tokio::test]
    async fn test_get_thread() {
        let repo = Arc::new(InMemoryThreadRepository::with_demo_threads(
            PersistedUser::new("test", "admin", Utc::now()),
        ));
        let handler = GetThreadHandler::new(repo);

        let thread = handler.handle(GetThreadQuery::new("test2")).await.unwrap();
        let thread = thread.unwrap();
        assert_eq!(thread.steps()[0].output(), "Message 3");
        assert_eq!(thread.steps()[1].output(), "Message 4");

        let missing = handler.handle(GetThreadQuery::new("nope")).await.unwrap();
        assert!(missing.is_none());
    }
}
