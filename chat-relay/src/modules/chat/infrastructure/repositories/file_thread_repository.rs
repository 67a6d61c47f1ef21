// 文件持久化线程仓储实现
//
// 使用 JSON 文件存储线程数据与软删除集合。修改先作用在副本上，
// 写回文件成功后才替换内存中的数据；写锁持有到写入结束。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::modules::chat::domain::{Step, Thread, ThreadId};
use crate::modules::chat::ports::{RepositoryError, ThreadFilter, ThreadRepository};

const THREADS_FILE_NAME: &str = "threads.json";

/// 持久化数据结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThreadStore {
    threads: Vec<Thread>,
    #[serde(default)]
    deleted_thread_ids: BTreeSet<ThreadId>,
}

/// 文件持久化线程仓储
pub struct FileThreadRepository {
    store: RwLock<ThreadStore>,
    file_path: PathBuf,
}

impl FileThreadRepository {
    /// 创建新的文件线程仓储
    ///
    /// # Arguments
    /// * `data_dir` - 数据目录路径
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let file_path = data_dir.as_ref().join(THREADS_FILE_NAME);

        // 确保目录存在
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::StorageError(e.to_string()))?;
        }

        // 尝试加载现有数据
        let store = if fs::try_exists(&file_path).await.unwrap_or(false) {
            let content = fs::read_to_string(&file_path)
                .await
                .map_err(|e| RepositoryError::StorageError(e.to_string()))?;

            serde_json::from_str(&content)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?
        } else {
            ThreadStore::default()
        };

        debug!(
            "Loaded {} threads from {}",
            store.threads.len(),
            file_path.display()
        );

        Ok(Self {
            store: RwLock::new(store),
            file_path,
        })
    }

    /// 文件不存在时写入种子线程
    pub async fn seed_if_empty(&self, threads: Vec<Thread>) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        if !store.threads.is_empty() {
            return Ok(());
        }
        let mut next = store.clone();
        next.threads = threads;
        self.persist(&next).await?;
        *store = next;
        Ok(())
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// 将数据持久化到文件，调用方持有写锁
    async fn persist(&self, store: &ThreadStore) -> Result<(), RepositoryError> {
        let content = serde_json::to_string_pretty(store)
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;

        fs::write(&self.file_path, content).await.map_err(|e| {
            warn!("Failed to write {}: {}", self.file_path.display(), e);
            RepositoryError::StorageError(e.to_string())
        })?;

        Ok(())
    }
}

#[async_trait]
impl ThreadRepository for FileThreadRepository {
    async fn get(&self, id: &ThreadId) -> Result<Option<Thread>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.threads.iter().find(|t| t.id() == id).cloned())
    }

    async fn save(&self, thread: &Thread) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let mut next = store.clone();
        if let Some(pos) = next.threads.iter().position(|t| t.id() == thread.id()) {
            next.threads[pos] = thread.clone();
        } else {
            next.threads.push(thread.clone());
        }
        self.persist(&next).await?;
        *store = next;
        Ok(())
    }

    async fn append_step(&self, id: &ThreadId, step: Step) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let mut next = store.clone();
        let thread = next
            .threads
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        let step_id = step.id().clone();
        if !thread.push_step(step) {
            return Err(RepositoryError::Conflict(format!(
                "step {} already exists in thread {}",
                step_id, id
            )));
        }
        self.persist(&next).await?;
        *store = next;
        Ok(())
    }

    async fn find_all(&self, filter: &ThreadFilter) -> Result<Vec<Thread>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .threads
            .iter()
            .filter(|t| !store.deleted_thread_ids.contains(t.id()))
            .filter(|t| filter.accepts(t))
            .cloned()
            .collect())
    }

    async fn mark_deleted(&self, id: &ThreadId) -> Result<bool, RepositoryError> {
        let mut store = self.store.write().await;
        if store.deleted_thread_ids.contains(id) {
            return Ok(false);
        }
        let mut next = store.clone();
        next.deleted_thread_ids.insert(id.clone());
        self.persist(&next).await?;
        *store = next;
        Ok(true)
    }

    async fn is_deleted(&self, id: &ThreadId) -> Result<bool, RepositoryError> {
        let store = self.store.read().await;
        Ok(store.deleted_thread_ids.contains(id))
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .threads
            .iter()
            .filter(|t| !store.deleted_thread_ids.contains(t.id()))
            .count())
    }
}
