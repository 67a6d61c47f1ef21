// Chat Session (Session Relay)
//
// 单个会话的消息历史与转发逻辑：把累积的历史发送给提供商，
// 把增量片段推送给调用方，完成后把完整回复追加到历史。

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{ApplicationError, StepQueue};
use crate::modules::chat::domain::{
    ChatSettings, SessionHistory, Step, StepId, StepType, Thread, ThreadId, DEFAULT_TEMPERATURE,
};
use crate::modules::chat::ports::{ChatOutputPort, CompletionRequest, LLMChatMessage, LLMPort};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 没有进行中的请求
    Idle,
    /// 正在生成回复
    Generating,
}

/// 会话启动参数
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub session_id: String,
    pub system_prompt: String,
    /// 助手消息的作者名
    pub assistant_name: String,
    /// 初始是否流式输出
    pub stream: bool,
    /// 初始温度
    pub temperature: f32,
}

impl SessionOptions {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_assistant_name(mut self, name: impl Into<String>) -> Self {
        self.assistant_name = name.into();
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            assistant_name: "Answer".to_string(),
            stream: true,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// 把完成的轮次记录到线程
#[derive(Clone)]
pub struct SessionRecorder {
    step_queue: Arc<StepQueue>,
    thread_id: ThreadId,
    author: String,
}

impl SessionRecorder {
    pub fn new(
        step_queue: Arc<StepQueue>,
        thread_id: ThreadId,
        author: impl Into<String>,
    ) -> Self {
        Self {
            step_queue,
            thread_id,
            author: author.into(),
        }
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }
}

/// 取消句柄
///
/// 可以在其它任务中持有；取消只影响进行中的生成
#[derive(Clone)]
pub struct SessionCanceller {
    tx: Arc<watch::Sender<bool>>,
}

impl SessionCanceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// 会话转发器
///
/// 一个会话由一个任务顺序驱动：`send_message` 需要 `&mut self`，
/// 因此同一会话不会并发修改历史。
pub struct ChatSession {
    session_id: String,
    assistant_name: String,
    llm: Arc<dyn LLMPort>,
    output: Arc<dyn ChatOutputPort>,
    history: SessionHistory,
    models: Vec<String>,
    settings: ChatSettings,
    state: SessionState,
    recorder: Option<SessionRecorder>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl ChatSession {
    /// 开始新会话：以系统提示初始化历史，获取模型列表，第一个模型为默认选择
    pub async fn start(
        options: SessionOptions,
        llm: Arc<dyn LLMPort>,
        output: Arc<dyn ChatOutputPort>,
    ) -> Result<Self, ApplicationError> {
        let history = SessionHistory::new(options.system_prompt.clone());
        let session = Self::open(options, llm, output, history).await?;

        info!(
            "Chat session {} started with model {}",
            session.session_id,
            session.settings.model()
        );
        Ok(session)
    }

    /// 恢复会话：从线程重建历史并发送欢迎消息
    pub async fn resume(
        options: SessionOptions,
        llm: Arc<dyn LLMPort>,
        output: Arc<dyn ChatOutputPort>,
        thread: &Thread,
    ) -> Result<Self, ApplicationError> {
        let history = SessionHistory::replay(options.system_prompt.clone(), thread);
        let session = Self::open(options, llm, output, history).await?;

        info!(
            "Chat session {} resumed thread {} ({} messages)",
            session.session_id,
            thread.id(),
            session.history.len()
        );
        session
            .output
            .deliver_message(
                &session.session_id,
                &session.assistant_name,
                &format!("Welcome back to {}", thread.name()),
            )
            .await;
        Ok(session)
    }

    async fn open(
        options: SessionOptions,
        llm: Arc<dyn LLMPort>,
        output: Arc<dyn ChatOutputPort>,
        history: SessionHistory,
    ) -> Result<Self, ApplicationError> {
        let models = llm.list_models().await?;
        debug!("Provider {} offers {} models", llm.provider_id(), models.len());

        let default = ChatSettings::from_catalogue(&models)?;
        let settings = ChatSettings::new(default.model(), options.stream, options.temperature)?;
        let (cancel_tx, _) = watch::channel(false);

        Ok(Self {
            session_id: options.session_id,
            assistant_name: options.assistant_name,
            llm,
            output,
            history,
            models,
            settings,
            state: SessionState::Idle,
            recorder: None,
            cancel_tx: Arc::new(cancel_tx),
        })
    }

    /// 把完成的轮次记录到线程
    pub fn with_recorder(mut self, recorder: SessionRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// 会话开始时获取的模型列表
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn recorder(&self) -> Option<&SessionRecorder> {
        self.recorder.as_ref()
    }

    pub fn canceller(&self) -> SessionCanceller {
        SessionCanceller {
            tx: self.cancel_tx.clone(),
        }
    }

    /// 更新会话设置，下一次生成开始时生效
    pub fn update_settings(&mut self, settings: ChatSettings) -> Result<(), ApplicationError> {
        settings.validate(&self.models)?;
        info!(
            "Session {} settings updated: model={}, stream={}, temperature={}",
            self.session_id,
            settings.model(),
            settings.stream(),
            settings.temperature()
        );
        self.settings = settings;
        Ok(())
    }

    /// 处理一条用户消息，返回完整的助手回复
    ///
    /// 提供商出错或被取消时，历史恢复到本轮之前的状态
    pub async fn send_message(
        &mut self,
        content: impl Into<String>,
    ) -> Result<String, ApplicationError> {
        let content = content.into();
        self.cancel_tx.send_replace(false);
        self.history.push_user(content.clone());
        self.state = SessionState::Generating;

        // 设置在每次生成开始时读取一次
        let settings = self.settings.clone();
        let result = self.generate(&settings).await;
        self.state = SessionState::Idle;

        match result {
            Ok(reply) => {
                self.history.push_assistant(reply.clone());
                self.output
                    .deliver_message(&self.session_id, &self.assistant_name, &reply)
                    .await;
                self.record_turn(&content, &reply).await;
                Ok(reply)
            }
            Err(e) => {
                self.history.pop_last();
                match &e {
                    ApplicationError::Cancelled => {
                        info!("Generation cancelled in session {}", self.session_id)
                    }
                    _ => warn!("Generation failed in session {}: {}", self.session_id, e),
                }
                self.output
                    .deliver_error(&self.session_id, &e.to_string())
                    .await;
                Err(e)
            }
        }
    }

    fn request_messages(&self) -> Vec<LLMChatMessage> {
        self.history
            .messages()
            .iter()
            .map(LLMChatMessage::from)
            .collect()
    }

    async fn generate(&self, settings: &ChatSettings) -> Result<String, ApplicationError> {
        let request = CompletionRequest::new(self.request_messages(), settings.model())
            .with_temperature(settings.temperature())
            .with_stream(settings.stream());
        let mut cancelled = self.cancel_tx.subscribe();

        debug!(
            "Session {} generating: model={}, stream={}, history={}",
            self.session_id,
            settings.model(),
            settings.stream(),
            self.history.len()
        );

        if !settings.stream() {
            return tokio::select! {
                result = self.llm.complete(request) => Ok(result?.content),
                _ = cancelled.wait_for(|c| *c) => Err(ApplicationError::Cancelled),
            };
        }

        let mut stream = tokio::select! {
            result = self.llm.complete_stream(request) => result?,
            _ = cancelled.wait_for(|c| *c) => return Err(ApplicationError::Cancelled),
        };

        let mut reply = String::new();
        loop {
            tokio::select! {
                next = stream.next() => match next {
                    Some(Ok(chunk)) => {
                        // 空片段不转发
                        if chunk.content.is_empty() {
                            continue;
                        }
                        self.output.deliver_token(&self.session_id, &chunk.content).await;
                        reply.push_str(&chunk.content);
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                _ = cancelled.wait_for(|c| *c) => return Err(ApplicationError::Cancelled),
            }
        }

        Ok(reply)
    }

    /// 用户消息、LLM 调用、助手回复依次进入步骤队列
    async fn record_turn(&self, content: &str, reply: &str) {
        let Some(recorder) = &self.recorder else {
            return;
        };

        let thread_id = recorder.thread_id.clone();
        let steps = [
            Step::user_message(thread_id.clone(), recorder.author.clone(), content),
            Step::new(
                StepId::new(),
                thread_id.clone(),
                "answer",
                StepType::Llm,
                reply,
            ),
            Step::assistant_message(thread_id.clone(), self.assistant_name.clone(), reply),
        ];

        for step in steps {
            if let Err(e) = recorder.step_queue.record(step).await {
                warn!("Failed to record step in thread {}: {}", thread_id, e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::chat::domain::{MessageRole, PersistedUser};
    use crate::modules::chat::infrastructure::{InMemoryThreadRepository, ScriptedLLMAdapter};
    use crate::modules::chat::ports::{LLMError, ThreadRepository};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// 记录所有推送的输出端口
    #[derive(Default)]
    struct RecordingOutput {
        tokens: Mutex<Vec<String>>,
        messages: Mutex<Vec<(String, String)>>,
        errors: Mutex<Vec<String>>,
    }

    impl RecordingOutput {
        fn tokens(&self) -> Vec<String> {
            self.tokens.lock().unwrap().clone()
        }

        fn messages(&self) -> Vec<(String, String)> {
            self.messages.lock().unwrap().clone()
        }

        fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatOutputPort for RecordingOutput {
        async fn deliver_token(&self, _session_id: &str, token: &str) {
            self.tokens.lock().unwrap().push(token.to_string());
        }

        async fn deliver_message(&self, _session_id: &str, author: &str, content: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((author.to_string(), content.to_string()));
        }

        async fn deliver_error(&self, _session_id: &str, error: &str) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    async fn start(
        adapter: ScriptedLLMAdapter,
    ) -> (ChatSession, Arc<ScriptedLLMAdapter>, Arc<RecordingOutput>) {
        let adapter = Arc::new(adapter);
        let output = Arc::new(RecordingOutput::default());
        let session = ChatSession::start(
            SessionOptions::new("session-1"),
            adapter.clone(),
            output.clone(),
        )
        .await
        .unwrap();
        (session, adapter, output)
    }

    #[tokio::test]
    async fn test_start_selects_first_model() {
        let adapter =
            ScriptedLLMAdapter::new(vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]);
        let (session, _, _) = start(adapter).await;

        assert_eq!(session.models(), ["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(session.settings().model(), "gpt-4o");
        assert!(session.settings().stream());
        assert_eq!(session.settings().temperature(), 1.0);
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_start_without_models_is_invalid_configuration() {
        let adapter = Arc::new(ScriptedLLMAdapter::new(vec![]));
        let result = ChatSession::start(
            SessionOptions::default(),
            adapter,
            Arc::new(RecordingOutput::default()),
        )
        .await;

        assert!(matches!(
            result,
            Err(ApplicationError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_fragments_are_not_forwarded() {
        let (mut session, _, output) =
            start(ScriptedLLMAdapter::default().with_reply(["Hel", "", "lo"])).await;

        let reply = session.send_message("hi").await.unwrap();

        assert_eq!(reply, "Hello");
        assert_eq!(output.tokens(), vec!["Hel", "lo"]);
        assert_eq!(
            output.messages(),
            vec![("Answer".to_string(), "Hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_streamed_and_whole_replies_leave_identical_history() {
        let (mut streamed, _, _) =
            start(ScriptedLLMAdapter::default().with_reply(["Hel", "", "lo"])).await;
        let (mut whole, _, whole_output) =
            start(ScriptedLLMAdapter::default().with_reply(["Hel", "", "lo"])).await;
        let settings = ChatSettings::new("scripted-model", false, 1.0).unwrap();
        whole.update_settings(settings).unwrap();

        streamed.send_message("hi").await.unwrap();
        whole.send_message("hi").await.unwrap();

        assert_eq!(streamed.history().messages(), whole.history().messages());
        assert!(whole_output.tokens().is_empty());
        assert_eq!(whole_output.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_history_and_settings() {
        let (mut session, adapter, _) = start(
            ScriptedLLMAdapter::default()
                .with_reply(["first"])
                .with_reply(["second"]),
        )
        .await;
        session
            .update_settings(ChatSettings::new("scripted-model", true, 0.3).unwrap())
            .unwrap();

        session.send_message("one").await.unwrap();
        session.send_message("two").await.unwrap();

        let requests = adapter.requests();
        let last = &requests[1];
        assert_eq!(last.temperature, Some(0.3));
        assert!(last.stream);
        let roles: Vec<&str> = last.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_system_prompt_stays_first() {
        let (mut session, _, _) = start(ScriptedLLMAdapter::default()).await;

        for i in 0..5 {
            session.send_message(format!("turn {}", i)).await.unwrap();
        }

        let messages = session.history().messages();
        assert_eq!(messages.len(), 11);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, "You are a helpful assistant.");
    }

    #[tokio::test]
    async fn test_provider_failure_rolls_back_history() {
        let (mut session, _, output) =
            start(ScriptedLLMAdapter::default().with_failure_after(["par", "tial"])).await;

        let result = session.send_message("hi").await;

        assert!(matches!(
            result,
            Err(ApplicationError::ProviderError(LLMError::NetworkError(_)))
        ));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(output.errors().len(), 1);
        assert!(output.messages().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_forwarding() {
        let adapter = ScriptedLLMAdapter::default()
            .with_reply(["a", "b", "c", "d", "e", "f"])
            .with_fragment_delay(Duration::from_millis(20));
        let (mut session, _, output) = start(adapter).await;

        let canceller = session.canceller();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = session.send_message("hi").await;

        assert!(matches!(result, Err(ApplicationError::Cancelled)));
        assert!(output.tokens().len() < 6);
        assert_eq!(session.history().len(), 1);

        // 取消不影响下一轮
        let reply = session.send_message("again").await.unwrap();
        assert_eq!(reply, "You said: again");
    }

    #[tokio::test]
    async fn test_update_settings_rejects_invalid_values() {
        let (mut session, _, _) = start(ScriptedLLMAdapter::default()).await;

        let unknown = ChatSettings::new("gpt-unknown", true, 1.0).unwrap();
        assert!(matches!(
            session.update_settings(unknown),
            Err(ApplicationError::InvalidConfiguration(_))
        ));
        assert!(ChatSettings::new("scripted-model", true, 2.5).is_err());
        assert_eq!(session.settings().model(), "scripted-model");
    }

    #[tokio::test]
    async fn test_resume_replays_thread_and_greets() {
        let owner = PersistedUser::new("test", "admin", Utc::now());
        let repo = InMemoryThreadRepository::with_demo_threads(owner);
        let thread = repo.get(&ThreadId::from("test2")).await.unwrap().unwrap();
        let output = Arc::new(RecordingOutput::default());

        let session = ChatSession::resume(
            SessionOptions::new("session-2"),
            Arc::new(ScriptedLLMAdapter::default()),
            output.clone(),
            &thread,
        )
        .await
        .unwrap();

        let contents: Vec<&str> = session
            .history()
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec!["You are a helpful assistant.", "Message 3", "Message 4"]
        );
        assert_eq!(
            output.messages(),
            vec![("Answer".to_string(), "Welcome back to thread 2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_completed_turn_is_recorded_user_first() {
        let owner = PersistedUser::new("test", "admin", Utc::now());
        let repo = Arc::new(InMemoryThreadRepository::with_demo_threads(owner.clone()));
        let queue = Arc::new(StepQueue::new(repo.clone(), owner));
        let thread_id = ThreadId::from("test2");

        let (session, _, _) = start(ScriptedLLMAdapter::default().with_reply(["Reply 5"])).await;
        let recorder = SessionRecorder::new(queue.clone(), thread_id.clone(), "admin");
        let mut session = session.with_recorder(recorder);

        session.send_message("Message 5").await.unwrap();

        let thread = repo.get(&thread_id).await.unwrap().unwrap();
        let types: Vec<StepType> = thread.steps().iter().map(|s| s.step_type()).collect();
        assert_eq!(
            types,
            vec![
                StepType::UserMessage,
                StepType::AssistantMessage,
                StepType::UserMessage,
                StepType::Llm,
                StepType::AssistantMessage,
            ]
        );
        assert_eq!(thread.steps()[2].output(), "Message 5");
        assert_eq!(queue.ingested(), 3);
        assert_eq!(queue.committed(), 3);
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_recorded() {
        let owner = PersistedUser::new("test", "admin", Utc::now());
        let repo = Arc::new(InMemoryThreadRepository::with_demo_threads(owner.clone()));
        let queue = Arc::new(StepQueue::new(repo.clone(), owner));

        let (session, _, _) = start(ScriptedLLMAdapter::default().with_failure_after(["x"])).await;
        let recorder = SessionRecorder::new(queue.clone(), ThreadId::from("test1"), "admin");
        let mut session = session.with_recorder(recorder);

        assert!(session.send_message("hi").await.is_err());
        assert_eq!(queue.ingested(), 0);
        let thread = repo.get(&ThreadId::from("test1")).await.unwrap().unwrap();
        assert_eq!(thread.steps().len(), 2);
    }
}
