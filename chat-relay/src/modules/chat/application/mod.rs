// Chat Application Layer - 应用层
// 实现 CQRS 模式的命令和查询处理器，以及会话转发与步骤记录

pub mod commands;
pub mod queries;
pub mod session;
pub mod step_queue;

// 导出命令和查询
pub use commands::*;
pub use queries::*;
pub use session::*;
pub use step_queue::*;

use async_trait::async_trait;
use thiserror::Error;

use super::domain::SettingsError;
use super::ports::{LLMError, RepositoryError};

/// 应用层错误类型
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication rejected for {0}")]
    AuthRejected(String),

    #[error("Provider error: {0}")]
    ProviderError(#[from] LLMError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Generation cancelled")]
    Cancelled,

    /// 已软删除的线程只读
    #[error("Thread {0} is deleted")]
    ThreadDeleted(String),
}

impl From<SettingsError> for ApplicationError {
    fn from(err: SettingsError) -> Self {
        ApplicationError::InvalidConfiguration(err.to_string())
    }
}

/// 命令处理器 trait
///
/// 遵循 CQRS 模式，命令处理器负责执行有副作用的操作
#[async_trait]
pub trait CommandHandler<C, R>: Send + Sync
where
    C: Send + Sync,
{
    /// 执行命令
    async fn handle(&self, command: C) -> Result<R, ApplicationError>;
}

/// 查询处理器 trait
///
/// 遵循 CQRS 模式，查询处理器负责只读操作
#[async_trait]
pub trait QueryHandler<Q, R>: Send + Sync
where
    Q: Send + Sync,
{
    /// 执行查询
    async fn handle(&self, query: Q) -> Result<R, ApplicationError>;
}
