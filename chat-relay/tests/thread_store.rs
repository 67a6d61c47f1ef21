use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

use chat_relay_lib::modules::chat::{
    ChatModule, ChatOutputPort, InMemoryThreadRepository, Pagination, PersistedUser,
    ScriptedLLMAdapter, Step, StepId, StepType, ThreadFilter, ThreadId,
};
use chat_relay_lib::modules::config::ChatConfig;

#[derive(Default)]
struct CollectingOutput {
    tokens: Mutex<Vec<String>>,
    messages: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ChatOutputPort for CollectingOutput {
    async fn deliver_token(&self, _session_id: &str, token: &str) {
        self.tokens.lock().unwrap().push(token.to_string());
    }

    async fn deliver_message(&self, _session_id: &str, author: &str, content: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((author.to_string(), content.to_string()));
    }

    async fn deliver_error(&self, _session_id: &str, _error: &str) {}
}

fn known_user() -> PersistedUser {
    PersistedUser::new("test", "admin", Utc::now())
}

fn demo_module(llm: ScriptedLLMAdapter) -> ChatModule {
    let owner = known_user();
    ChatModule::with_repository(
        Arc::new(InMemoryThreadRepository::with_demo_threads(owner.clone())),
        Arc::new(llm),
        ChatConfig::default(),
        owner,
    )
}

async fn listed_ids(module: &ChatModule) -> Vec<String> {
    module
        .list_threads(Pagination::new(20), ThreadFilter::default())
        .await
        .unwrap()
        .data
        .iter()
        .map(|t| t.id().to_string())
        .collect()
}

#[tokio::test]
async fn deleted_thread_leaves_listing_but_stays_readable() {
    let module = demo_module(ScriptedLLMAdapter::default());

    assert_eq!(listed_ids(&module).await, vec!["test1", "test2"]);

    let response = module.delete_thread(&ThreadId::from("test1")).await.unwrap();
    assert!(response.newly_deleted);
    assert_eq!(listed_ids(&module).await, vec!["test2"]);

    let thread = module
        .get_thread(&ThreadId::from("test1"))
        .await
        .unwrap()
        .expect("deleted thread is still readable");
    let outputs: Vec<&str> = thread.steps().iter().map(|s| s.output()).collect();
    assert_eq!(outputs, vec!["Message 1", "Message 2"]);

    let again = module.delete_thread(&ThreadId::from("test1")).await.unwrap();
    assert!(!again.newly_deleted);
}

#[tokio::test]
async fn steps_before_user_message_are_committed_after_it() {
    let module = demo_module(ScriptedLLMAdapter::default());
    let thread_id = ThreadId::from("fresh");

    let llm_step = Step::new(
        StepId::from("s-llm"),
        thread_id.clone(),
        "answer",
        StepType::Llm,
        "",
    );
    let early = module.record_step(llm_step).await.unwrap();
    assert!(early.committed.is_empty());
    assert!(module.get_thread(&thread_id).await.unwrap().is_none());

    let user_step = Step::new(
        StepId::from("s-user"),
        thread_id.clone(),
        "admin",
        StepType::UserMessage,
        "hi there",
    );
    let committed = module.record_step(user_step).await.unwrap();
    assert_eq!(
        committed.committed,
        vec![StepId::from("s-user"), StepId::from("s-llm")]
    );

    let thread = module.get_thread(&thread_id).await.unwrap().unwrap();
    assert_eq!(thread.name(), "hi there");
    assert_eq!(thread.user().identifier, "admin");
    let ids: Vec<&str> = thread.steps().iter().map(|s| s.id().as_str()).collect();
    assert_eq!(ids, vec!["s-user", "s-llm"]);

    let author = module.get_thread_author(&thread_id).await.unwrap();
    assert_eq!(author, "admin");
}

#[tokio::test]
async fn streamed_turn_is_relayed_and_recorded() {
    let module = demo_module(ScriptedLLMAdapter::default().with_reply(["Hel", "", "lo"]));
    let output = Arc::new(CollectingOutput::default());

    let mut session = module.start_session(output.clone()).await.unwrap();
    let reply = session.send_message("Hi").await.unwrap();

    assert_eq!(reply, "Hello");
    assert_eq!(*output.tokens.lock().unwrap(), vec!["Hel", "lo"]);
    assert_eq!(
        *output.messages.lock().unwrap(),
        vec![("Answer".to_string(), "Hello".to_string())]
    );

    let thread_id = session.recorder().unwrap().thread_id().clone();
    let thread = module.get_thread(&thread_id).await.unwrap().unwrap();
    let kinds: Vec<StepType> = thread.steps().iter().map(|s| s.step_type()).collect();
    assert_eq!(
        kinds,
        vec![StepType::UserMessage, StepType::Llm, StepType::AssistantMessage]
    );
    assert_eq!(thread.steps()[2].output(), "Hello");
}
