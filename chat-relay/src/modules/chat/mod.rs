// Chat Module - 聊天模块
//
// 实现六边形架构（Hexagonal Architecture）：
// - domain: 领域层，包含线程、步骤、会话历史等实体与值对象
// - ports: 端口层，定义线程仓储、LLM 提供商与输出端口
// - infrastructure: 基础设施层，实现端口的具体适配器
// - application: 应用层，CQRS 处理器、步骤队列与会话转发

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// 重新导出常用类型
pub use application::{
    ApplicationError, ChatSession, CommandHandler, CreateUserCommand, CreateUserHandler,
    DeleteThreadCommand, DeleteThreadHandler, DeleteThreadResponse, GetThreadAuthorHandler,
    GetThreadAuthorQuery, GetThreadHandler, GetThreadQuery, GetUserHandler, GetUserQuery,
    ListThreadsHandler, ListThreadsQuery, QueryHandler, RecordStepCommand, RecordStepHandler,
    RecordStepResponse, SessionCanceller, SessionOptions, SessionRecorder, SessionState,
    StepQueue,
};

pub use domain::{
    ChatSettings, HistoryMessage, MessageRole, PersistedUser, SessionHistory, SettingsError,
    Step, StepId, StepType, Thread, ThreadId, ThreadMetadata, User,
};

pub use infrastructure::{
    build_llm_adapter, demo_threads, FileThreadRepository, InMemoryThreadRepository,
    OpenAIAdapter, OpenAIConfig, ScriptedLLMAdapter,
};

pub use ports::{
    ChatOutputPort, ChunkStream, CompletionRequest, CompletionResponse, FinishReason,
    LLMChatMessage, LLMError, LLMPort, PageInfo, PaginatedResponse, Pagination,
    RepositoryError, StreamChunk, ThreadFilter, ThreadRepository, TokenUsage,
};

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::modules::config::{AppConfig, ChatConfig, StorageBackend};

/// Chat 模块容器
///
/// 管理模块内的依赖注入：线程仓储、步骤队列与 LLM 提供商
pub struct ChatModule {
    // Repositories
    thread_repository: Arc<dyn ThreadRepository>,
    step_queue: Arc<StepQueue>,
    // LLM
    llm: Arc<dyn LLMPort>,
    // Session defaults
    chat_config: ChatConfig,
    known_user: PersistedUser,
    // Handlers
    list_threads_handler: ListThreadsHandler,
    get_thread_handler: GetThreadHandler,
    get_thread_author_handler: GetThreadAuthorHandler,
    get_user_handler: GetUserHandler,
    create_user_handler: CreateUserHandler,
    delete_thread_handler: DeleteThreadHandler,
    record_step_handler: RecordStepHandler,
}

impl ChatModule {
    /// 根据配置创建 ChatModule
    ///
    /// `storage.backend` 选择线程仓储；文件后端的数据目录优先取配置，
    /// 否则使用 `data_dir`。
    pub async fn from_config(
        config: &AppConfig,
        data_dir: &Path,
        llm: Arc<dyn LLMPort>,
    ) -> Result<Self, RepositoryError> {
        let known_user = PersistedUser::new(
            config.auth.user_id.clone(),
            config.auth.username.clone(),
            Utc::now(),
        );
        let seed = config.storage.seed_demo_threads;

        let thread_repository: Arc<dyn ThreadRepository> = match config.storage.backend {
            StorageBackend::Memory => {
                if seed {
                    Arc::new(InMemoryThreadRepository::with_demo_threads(
                        known_user.clone(),
                    ))
                } else {
                    Arc::new(InMemoryThreadRepository::new())
                }
            }
            StorageBackend::File => {
                let dir = config.storage.data_dir.as_deref().unwrap_or(data_dir);
                let repository = FileThreadRepository::new(dir).await?;
                if seed {
                    repository
                        .seed_if_empty(demo_threads(known_user.clone()))
                        .await?;
                }
                Arc::new(repository)
            }
        };

        info!(
            "Chat module using {} thread storage",
            config.storage.backend.as_str()
        );

        Ok(Self::with_repository(
            thread_repository,
            llm,
            config.chat.clone(),
            known_user,
        ))
    }

    /// 使用自定义仓储创建 ChatModule
    pub fn with_repository(
        thread_repository: Arc<dyn ThreadRepository>,
        llm: Arc<dyn LLMPort>,
        chat_config: ChatConfig,
        known_user: PersistedUser,
    ) -> Self {
        let step_queue = Arc::new(StepQueue::new(
            thread_repository.clone(),
            known_user.clone(),
        ));

        Self {
            list_threads_handler: ListThreadsHandler::new(thread_repository.clone()),
            get_thread_handler: GetThreadHandler::new(thread_repository.clone()),
            get_thread_author_handler: GetThreadAuthorHandler::new(
                thread_repository.clone(),
                known_user.identifier.clone(),
            ),
            get_user_handler: GetUserHandler::new(known_user.clone()),
            create_user_handler: CreateUserHandler::new(known_user.clone()),
            delete_thread_handler: DeleteThreadHandler::new(thread_repository.clone()),
            record_step_handler: RecordStepHandler::new(step_queue.clone()),
            thread_repository,
            step_queue,
            llm,
            chat_config,
            known_user,
        }
    }

    // Thread store

    /// 获取用户（总是成功）
    pub async fn get_user(&self, identifier: &str) -> Result<PersistedUser, ApplicationError> {
        self.get_user_handler
            .handle(GetUserQuery::new(identifier))
            .await
    }

    /// 创建用户（回显持久化形式）
    pub async fn create_user(&self, user: User) -> Result<PersistedUser, ApplicationError> {
        self.create_user_handler
            .handle(CreateUserCommand::new(user))
            .await
    }

    /// 记录步骤（等待同一轮的用户消息后才写入）
    pub async fn record_step(&self, step: Step) -> Result<RecordStepResponse, ApplicationError> {
        self.record_step_handler
            .handle(RecordStepCommand::new(step))
            .await
    }

    /// 列出未删除的线程（单页）
    pub async fn list_threads(
        &self,
        pagination: Pagination,
        filter: ThreadFilter,
    ) -> Result<PaginatedResponse<Thread>, ApplicationError> {
        self.list_threads_handler
            .handle(ListThreadsQuery::new(pagination, filter))
            .await
    }

    /// 按 ID 获取线程，已软删除的线程同样返回
    pub async fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>, ApplicationError> {
        self.get_thread_handler
            .handle(GetThreadQuery::new(id.clone()))
            .await
    }

    /// 软删除线程，重复删除无额外效果
    pub async fn delete_thread(
        &self,
        id: &ThreadId,
    ) -> Result<DeleteThreadResponse, ApplicationError> {
        self.delete_thread_handler
            .handle(DeleteThreadCommand::new(id.clone()))
            .await
    }

    /// 获取线程所有者标识
    pub async fn get_thread_author(&self, id: &ThreadId) -> Result<String, ApplicationError> {
        self.get_thread_author_handler
            .handle(GetThreadAuthorQuery::new(id.clone()))
            .await
    }

    // Sessions

    /// 提供商可用的模型
    pub async fn list_models(&self) -> Result<Vec<String>, ApplicationError> {
        Ok(self.llm.list_models().await?)
    }

    /// 开始新会话，完成的轮次记录到一个新线程
    pub async fn start_session(
        &self,
        output: Arc<dyn ChatOutputPort>,
    ) -> Result<ChatSession, ApplicationError> {
        let session = ChatSession::start(self.session_options(), self.llm.clone(), output).await?;
        Ok(session.with_recorder(self.recorder(ThreadId::new())))
    }

    /// 恢复已存储的线程，已删除的线程视为不存在
    pub async fn resume_session(
        &self,
        id: &ThreadId,
        output: Arc<dyn ChatOutputPort>,
    ) -> Result<ChatSession, ApplicationError> {
        if self.thread_repository.is_deleted(id).await? {
            return Err(ApplicationError::NotFound(id.to_string()));
        }

        let thread = self
            .get_thread(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(id.to_string()))?;

        let session =
            ChatSession::resume(self.session_options(), self.llm.clone(), output, &thread).await?;
        Ok(session.with_recorder(self.recorder(id.clone())))
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .with_system_prompt(self.chat_config.system_prompt.clone())
            .with_assistant_name(self.chat_config.assistant_name.clone())
            .with_stream(self.chat_config.default_stream)
            .with_temperature(self.chat_config.default_temperature)
    }

    fn recorder(&self, thread_id: ThreadId) -> SessionRecorder {
        SessionRecorder::new(
            self.step_queue.clone(),
            thread_id,
            self.known_user.identifier.clone(),
        )
    }

    // Accessors

    /// 获取线程仓储
    pub fn thread_repository(&self) -> &Arc<dyn ThreadRepository> {
        &self.thread_repository
    }

    /// 获取步骤队列
    pub fn step_queue(&self) -> &Arc<StepQueue> {
        &self.step_queue
    }

    /// 获取 LLM 提供商
    pub fn llm(&self) -> &Arc<dyn LLMPort> {
        &self.llm
    }

    /// 唯一的已知用户
    pub fn known_user(&self) -> &PersistedUser {
        &self.known_user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct SilentOutput;

    #[async_trait]
    impl ChatOutputPort for SilentOutput {
        async fn deliver_token(&self, _session_id: &str, _token: &str) {}
        async fn deliver_message(&self, _session_id: &str, _author: &str, _content: &str) {}
        async fn deliver_error(&self, _session_id: &str, _error: &str) {}
    }

    fn scripted() -> Arc<dyn LLMPort> {
        Arc::new(ScriptedLLMAdapter::default())
    }

    #[tokio::test]
    async fn test_chat_module_thread_store() {
        let module = ChatModule::from_config(&AppConfig::default(), Path::new("."), scripted())
            .await
            .unwrap();

        let page = module
            .list_threads(Pagination::default(), ThreadFilter::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);

        let author = module
            .get_thread_author(&ThreadId::from("test1"))
            .await
            .unwrap();
        assert_eq!(author, "admin");

        let user = module.get_user("admin").await.unwrap();
        assert_eq!(user.id, "test");
    }

    #[tokio::test]
    async fn test_session_turns_are_recorded_in_new_thread() {
        let module = ChatModule::from_config(&AppConfig::default(), Path::new("."), scripted())
            .await
            .unwrap();

        let mut session = module.start_session(Arc::new(SilentOutput)).await.unwrap();
        session.send_message("hello there").await.unwrap();

        let thread_id = session.recorder().unwrap().thread_id().clone();
        let thread = module.get_thread(&thread_id).await.unwrap().unwrap();
        assert_eq!(thread.name(), "hello there");
        assert_eq!(thread.steps().len(), 3);

        let page = module
            .list_threads(Pagination::default(), ThreadFilter::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 3);
    }

    #[tokio::test]
    async fn test_resume_missing_thread_is_not_found() {
        let module = ChatModule::from_config(&AppConfig::default(), Path::new("."), scripted())
            .await
            .unwrap();

        let result = module
            .resume_session(&ThreadId::from("missing"), Arc::new(SilentOutput))
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_deleted_thread_cannot_be_resumed() {
        let module = ChatModule::from_config(&AppConfig::default(), Path::new("."), scripted())
            .await
            .unwrap();
        let id = ThreadId::from("test1");
        module.delete_thread(&id).await.unwrap();

        let result = module.resume_session(&id, Arc::new(SilentOutput)).await;
        assert!(matches!(result, Err(ApplicationError::NotFound(_))));

        let thread = module.get_thread(&id).await.unwrap().unwrap();
        assert_eq!(thread.steps().len(), 2);
    }

    #[tokio::test]
    async fn test_file_backend_survives_restart() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::File;

        let module = ChatModule::from_config(&config, dir.path(), scripted())
            .await
            .unwrap();
        module.delete_thread(&ThreadId::from("test1")).await.unwrap();

        let reopened = ChatModule::from_config(&config, dir.path(), scripted())
            .await
            .unwrap();
        let page = reopened
            .list_threads(Pagination::default(), ThreadFilter::default())
            .await
            .unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id().as_str(), "test2");
        assert!(reopened
            .get_thread(&ThreadId::from("test1"))
            .await
            .unwrap()
            .is_some());
    }
}
