// Chat Commands
//
// 交互式会话：读取标准输入的每一行作为用户消息，
// 订阅事件总线把 token 与完整消息渲染到终端

use clap::Args;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::infrastructure::{AppEvent, AppState, EventBus};
use crate::modules::chat::{ApplicationError, ChatSession, ChatSettings, ThreadId};
use crate::shared::AppResult;

#[derive(Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// Resume a stored thread instead of starting a new one
    #[arg(long)]
    pub resume: Option<String>,

    /// Deliver replies only when complete
    #[arg(long)]
    pub no_stream: bool,

    /// Model to use instead of the first one offered
    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,
}

/// 会话内的斜杠命令
#[derive(Debug, PartialEq)]
enum SlashCommand {
    Quit,
    Models,
    Settings,
    Set { key: String, value: String },
    Unknown(String),
}

impl SlashCommand {
    fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let command = match parts.next().unwrap_or_default() {
            "quit" | "exit" => SlashCommand::Quit,
            "models" => SlashCommand::Models,
            "settings" => SlashCommand::Settings,
            "set" => match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => SlashCommand::Set {
                    key: key.to_string(),
                    value: value.to_string(),
                },
                _ => SlashCommand::Unknown(line.to_string()),
            },
            _ => SlashCommand::Unknown(line.to_string()),
        };
        Some(command)
    }
}

/// 在当前设置上修改一项
fn apply_setting(
    current: &ChatSettings,
    key: &str,
    value: &str,
) -> Result<ChatSettings, ApplicationError> {
    let mut model = current.model().to_string();
    let mut stream = current.stream();
    let mut temperature = current.temperature();

    match key {
        "model" => model = value.to_string(),
        "stream" => {
            stream = match value {
                "on" | "true" | "yes" => true,
                "off" | "false" | "no" => false,
                _ => {
                    return Err(ApplicationError::InvalidConfiguration(format!(
                        "stream expects on/off, got {}",
                        value
                    )))
                }
            }
        }
        "temperature" => {
            temperature = value.parse().map_err(|_| {
                ApplicationError::InvalidConfiguration(format!("invalid temperature: {}", value))
            })?
        }
        other => {
            return Err(ApplicationError::InvalidConfiguration(format!(
                "unknown setting: {}",
                other
            )))
        }
    }

    Ok(ChatSettings::new(model, stream, temperature)?)
}

/// 更新会话设置并通知订阅者
fn update_settings(
    session: &mut ChatSession,
    event_bus: &EventBus,
    settings: ChatSettings,
) -> Result<(), ApplicationError> {
    session.update_settings(settings)?;
    event_bus.publish(AppEvent::SettingsUpdated {
        session_id: session.session_id().to_string(),
        settings: session.settings().clone(),
    });
    Ok(())
}

/// 把一个事件写到终端，`streaming` 记录已经输出过 token 的会话
fn render_event(out: &mut impl Write, event: AppEvent, streaming: &mut HashSet<String>) {
    match event {
        AppEvent::MessageChunk(chunk) => {
            if streaming.insert(chunk.session_id.clone()) {
                let _ = write!(out, "Answer: ");
            }
            let _ = write!(out, "{}", chunk.content);
        }
        AppEvent::MessageComplete(message) => {
            // 流式输出过的回复只需换行
            if streaming.remove(&message.session_id) {
                let _ = writeln!(out);
            } else {
                let _ = writeln!(out, "{}: {}", message.author, message.content);
            }
        }
        AppEvent::MessageError { session_id, error } => {
            if streaming.remove(&session_id) {
                let _ = writeln!(out);
            }
            eprintln!("error: {}", error);
        }
        AppEvent::SettingsUpdated { settings, .. } => {
            let _ = writeln!(
                out,
                "[settings] model={} stream={} temperature={}",
                settings.model(),
                settings.stream(),
                settings.temperature()
            );
        }
    }
    let _ = out.flush();
}

/// 后台渲染任务
struct Renderer {
    handle: JoinHandle<usize>,
    stop: oneshot::Sender<()>,
}

impl Renderer {
    /// 订阅事件总线并开始渲染
    fn spawn<W>(event_bus: &EventBus, mut out: W) -> Self
    where
        W: Write + Send + 'static,
    {
        let mut rx = event_bus.subscribe();
        let (stop, mut stopped) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut streaming = HashSet::new();
            let mut rendered = 0;
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(event) => {
                            render_event(&mut out, event, &mut streaming);
                            rendered += 1;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Renderer lagged behind by {} events", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = &mut stopped => {
                        // 退出前渲染已经发布的事件
                        loop {
                            match rx.try_recv() {
                                Ok(event) => {
                                    render_event(&mut out, event, &mut streaming);
                                    rendered += 1;
                                }
                                Err(TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                }
            }
            rendered
        });
        Self { handle, stop }
    }

    /// 停止渲染并等待剩余事件输出，返回渲染的事件数
    async fn finish(self) -> usize {
        let _ = self.stop.send(());
        match self.handle.await {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!("Renderer task failed: {}", e);
                0
            }
        }
    }
}

/// 交互式会话
pub async fn run_chat(state: Arc<AppState>, args: ChatArgs) -> AppResult<()> {
    // 先订阅，恢复会话时的欢迎消息也能渲染
    let renderer = Renderer::spawn(&state.event_bus, std::io::stdout());

    let output = state.event_bus.clone();
    let mut session = match &args.resume {
        Some(id) => {
            state
                .chat
                .resume_session(&ThreadId::from(id.as_str()), output)
                .await?
        }
        None => state.chat.start_session(output).await?,
    };

    if args.model.is_some() || args.no_stream || args.temperature.is_some() {
        let current = session.settings();
        let settings = ChatSettings::new(
            args.model.clone().unwrap_or_else(|| current.model().to_string()),
            !args.no_stream && current.stream(),
            args.temperature.unwrap_or(current.temperature()),
        )
        .map_err(ApplicationError::from)?;
        update_settings(&mut session, &state.event_bus, settings)?;
    }

    println!(
        "Chatting with {} (type /quit to leave, /models, /settings, /set <key> <value>)",
        session.settings().model()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        // 第一次监听 Ctrl-C 后默认的退出行为失效，空闲时在这里处理
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = SlashCommand::parse(line) {
            match command {
                SlashCommand::Quit => break,
                SlashCommand::Models => println!("{}", session.models().join("\n")),
                SlashCommand::Settings => {
                    let settings = session.settings();
                    println!(
                        "model={} stream={} temperature={}",
                        settings.model(),
                        settings.stream(),
                        settings.temperature()
                    );
                }
                SlashCommand::Set { key, value } => {
                    let result = apply_setting(session.settings(), &key, &value)
                        .and_then(|s| update_settings(&mut session, &state.event_bus, s));
                    if let Err(e) = result {
                        eprintln!("error: {}", e);
                    }
                }
                SlashCommand::Unknown(text) => eprintln!("unknown command: {}", text),
            }
            continue;
        }

        send_with_interrupt(&state, &mut session, line).await;
    }

    drop(session);
    renderer.finish().await;
    Ok(())
}

/// 发送一条消息；生成期间 Ctrl-C 取消本轮
async fn send_with_interrupt(state: &AppState, session: &mut ChatSession, line: &str) {
    let session_id = session.session_id().to_string();
    state
        .register_generation(&session_id, session.canceller())
        .await;

    let result = {
        let generation = session.send_message(line);
        tokio::pin!(generation);
        loop {
            tokio::select! {
                result = &mut generation => break result,
                _ = tokio::signal::ctrl_c() => {
                    state.cancel_generation(&session_id).await;
                }
            }
        }
    };

    state.finish_generation(&session_id).await;

    // 错误已经通过事件总线渲染
    if let Err(e) = result {
        tracing::debug!("Turn ended without a reply: {}", e);
    }
}
