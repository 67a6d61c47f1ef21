use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::modules::chat::domain::{
    PersistedUser, Step, StepId, StepType, Thread, ThreadId, ThreadMetadata,
};
use crate::modules::chat::ports::{RepositoryError, ThreadFilter, ThreadRepository};

/// 仓储内部状态：线程按插入顺序保存，删除只记录 ID
#[derive(Debug, Default)]
struct ThreadTable {
    threads: Vec<Thread>,
    deleted: HashSet<ThreadId>,
}

/// 内存线程仓储
///
/// 用于开发和测试，进程结束即丢失
pub struct InMemoryThreadRepository {
    table: RwLock<ThreadTable>,
}

impl InMemoryThreadRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(ThreadTable::default()),
        }
    }

    /// 使用给定线程初始化
    pub fn with_threads(threads: Vec<Thread>) -> Self {
        Self {
            table: RwLock::new(ThreadTable {
                threads,
                deleted: HashSet::new(),
            }),
        }
    }

    /// 使用演示数据初始化（test1 / test2 两个线程）
    pub fn with_demo_threads(owner: PersistedUser) -> Self {
        Self::with_threads(demo_threads(owner))
    }
}

impl Default for InMemoryThreadRepository {
    fn default() -> Self {
        Self::new()
    }
}

/// 演示用的两个线程，各含一问一答
pub fn demo_threads(owner: PersistedUser) -> Vec<Thread> {
    let now = Utc::now();
    let seed = |thread_id: &str, name: &str, steps: [(&str, StepType, &str); 2]| {
        let id = ThreadId::from(thread_id);
        Thread::new(id.clone(), owner.clone(), ThreadMetadata::named(name))
            .with_created_at(now)
            .with_steps(steps.into_iter().map(|(step_id, step_type, output)| {
                Step::new(StepId::from(step_id), id.clone(), "test", step_type, output)
                    .with_created_at(now)
            }))
    };

    vec![
        seed(
            "test1",
            "thread 1",
            [
                ("test1", StepType::UserMessage, "Message 1"),
                ("test2", StepType::AssistantMessage, "Message 2"),
            ],
        ),
        seed(
            "test2",
            "thread 2",
            [
                ("test3", StepType::UserMessage, "Message 3"),
                ("test4", StepType::AssistantMessage, "Message 4"),
            ],
        ),
    ]
}

#[async_trait]
impl ThreadRepository for InMemoryThreadRepository {
    async fn get(&self, id: &ThreadId) -> Result<Option<Thread>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.threads.iter().find(|t| t.id() == id).cloned())
    }

    async fn save(&self, thread: &Thread) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;

        // 检查是否已存在（更新）
        if let Some(existing) = table.threads.iter_mut().find(|t| t.id() == thread.id()) {
            *existing = thread.clone();
        } else {
            table.threads.push(thread.clone());
        }

        Ok(())
    }

    async fn append_step(&self, id: &ThreadId, step: Step) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        let thread = table
            .threads
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        let step_id = step.id().clone();
        if thread.push_step(step) {
            Ok(())
        } else {
            Err(RepositoryError::Conflict(format!(
                "step {} already exists in thread {}",
                step_id, id
            )))
        }
    }

    async fn find_all(&self, filter: &ThreadFilter) -> Result<Vec<Thread>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .threads
            .iter()
            .filter(|t| !table.deleted.contains(t.id()))
            .filter(|t| filter.accepts(t))
            .cloned()
            .collect())
    }

    async fn mark_deleted(&self, id: &ThreadId) -> Result<bool, RepositoryError> {
        let mut table = self.table.write().await;
        Ok(table.deleted.insert(id.clone()))
    }

    async fn is_deleted(&self, id: &ThreadId) -> Result<bool, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.deleted.contains(id))
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .threads
            .iter()
            .filter(|t| !table.deleted.contains(t.id()))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> PersistedUser {
        PersistedUser::new("test", "admin", Utc::now())
    }

    fn ids(threads: &[Thread]) -> Vec<&str> {
        threads.iter().map(|t| t.id().as_str()).collect()
    }

    #[tokio::test]
    async fn test_demo_threads_listed_in_order() {
        let repo = InMemoryThreadRepository::with_demo_threads(owner());
        let threads = repo.find_all(&ThreadFilter::default()).await.unwrap();

        assert_eq!(ids(&threads), vec!["test1", "test2"]);
        assert_eq!(threads[1].steps()[0].output(), "Message 3");
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_data() {
        let repo = InMemoryThreadRepository::with_demo_threads(owner());
        let id = ThreadId::from("test1");

        assert!(repo.mark_deleted(&id).await.unwrap());
        assert!(!repo.mark_deleted(&id).await.unwrap());

        let listed = repo.find_all(&ThreadFilter::default()).await.unwrap();
        assert_eq!(ids(&listed), vec!["test2"]);
        assert_eq!(repo.count().await.unwrap(), 1);

        let thread = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(thread.steps().len(), 2);
        assert!(repo.is_deleted(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_append_step() {
        let repo = InMemoryThreadRepository::with_demo_threads(owner());
        let id = ThreadId::from("test2");

        let step = Step::user_message(id.clone(), "admin", "Message 5");
        repo.append_step(&id, step.clone()).await.unwrap();

        let thread = repo.get(&id).await.unwrap().unwrap();
        assert_eq!(thread.steps().len(), 3);

        let err = repo.append_step(&id, step).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_append_step_to_missing_thread() {
        let repo = InMemoryThreadRepository::new();
        let id = ThreadId::from("missing");
        let err = repo
            .append_step(&id, Step::user_message(id.clone(), "admin", "hi"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_filter_by_search() {
        let repo = InMemoryThreadRepository::with_demo_threads(owner());
        let filter = ThreadFilter {
            search: Some("message 4".to_string()),
            user_identifier: None,
        };

        let threads = repo.find_all(&filter).await.unwrap();
        assert_eq!(ids(&threads), vec!["test2"]);
    }

    #[tokio::test]
    async fn test_filter_by_user() {
        let repo = InMemoryThreadRepository::with_demo_threads(owner());
        let filter = ThreadFilter {
            search: None,
            user_identifier: Some("someone-else".to_string()),
        };

        assert!(repo.find_all(&filter).await.unwrap().is_empty());
    }
}
