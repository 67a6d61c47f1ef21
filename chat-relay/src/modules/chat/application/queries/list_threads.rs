use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::super::{ApplicationError, QueryHandler};
use crate::modules::chat::domain::Thread;
use crate::modules::chat::ports::{PaginatedResponse, Pagination, ThreadFilter, ThreadRepository};

/// 列出线程查询
#[derive(Debug, Clone, Default)]
pub struct ListThreadsQuery {
    pub pagination: Pagination,
    pub filter: ThreadFilter,
}

impl ListThreadsQuery {
    pub fn new(pagination: Pagination, filter: ThreadFilter) -> Self {
        Self { pagination, filter }
    }
}

/// 列出线程查询处理器
///
/// 返回所有未删除的线程，总是单页（`has_next_page = false`），分页参数只用于日志
pub struct ListThreadsHandler {
    thread_repository: Arc<dyn ThreadRepository>,
}

impl ListThreadsHandler {
    pub fn new(thread_repository: Arc<dyn ThreadRepository>) -> Self {
        Self { thread_repository }
    }
}

#[async_trait]
impl QueryHandler<ListThreadsQuery, PaginatedResponse<Thread>> for ListThreadsHandler {
    async fn handle(
        &self,
        query: ListThreadsQuery,
    ) -> Result<PaginatedResponse<Thread>, ApplicationError> {
        let threads = self.thread_repository.find_all(&query.filter).await?;

        debug!(
            "Listing {} threads (requested first={}, cursor={:?})",
            threads.len(),
            query.pagination.first,
            query.pagination.cursor
        );

        Ok(PaginatedResponse::single_page(threads))
    }
}
