use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::super::domain::{Step, Thread, ThreadId};

/// 仓储错误类型
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// 分页参数
///
/// 与前端框架的分页协议保持一致：`first` 为期望条数，`cursor` 为上一页末尾
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub first: u32,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl Pagination {
    pub fn new(first: u32) -> Self {
        Self {
            first,
            cursor: None,
        }
    }
}

/// 线程过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadFilter {
    /// 按名称或消息内容搜索
    #[serde(default)]
    pub search: Option<String>,
    /// 只返回该用户拥有的线程
    #[serde(default)]
    pub user_identifier: Option<String>,
}

impl ThreadFilter {
    pub fn accepts(&self, thread: &Thread) -> bool {
        if let Some(identifier) = &self.user_identifier {
            if &thread.user().identifier != identifier {
                return false;
            }
        }
        match &self.search {
            Some(keyword) if !keyword.trim().is_empty() => thread.matches(keyword.trim()),
            _ => true,
        }
    }
}

/// 分页信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page_info: PageInfo,
}

impl<T> PaginatedResponse<T> {
    /// 单页结果：不再有后续页
    pub fn single_page(data: Vec<T>) -> Self {
        Self {
            data,
            page_info: PageInfo::default(),
        }
    }
}

/// 线程仓储端口
///
/// 定义线程持久化的抽象接口。删除为软删除：`mark_deleted` 只记录 ID，
/// `get` 仍能返回原始数据，`find_all` 不再包含它。
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// 根据 ID 获取线程（包括已软删除的线程）
    async fn get(&self, id: &ThreadId) -> Result<Option<Thread>, RepositoryError>;

    /// 保存线程（创建或整体替换）
    async fn save(&self, thread: &Thread) -> Result<(), RepositoryError>;

    /// 向线程追加一个步骤
    async fn append_step(&self, id: &ThreadId, step: Step) -> Result<(), RepositoryError>;

    /// 列出未删除且满足过滤条件的线程，保持插入顺序
    async fn find_all(&self, filter: &ThreadFilter) -> Result<Vec<Thread>, RepositoryError>;

    /// 标记删除，返回是否为首次标记
    async fn mark_deleted(&self, id: &ThreadId) -> Result<bool, RepositoryError>;

    /// 是否已被软删除
    async fn is_deleted(&self, id: &ThreadId) -> Result<bool, RepositoryError>;

    /// 未删除线程数量
    async fn count(&self) -> Result<usize, RepositoryError>;
}
