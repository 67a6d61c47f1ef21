// Host Commands
//
// 终端前端：命令行解析、启动流程与各子命令的处理

pub mod chat;
pub mod config;
pub mod threads;

pub use chat::*;
pub use config::*;
pub use threads::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::infrastructure::AppState;
use crate::modules::config::{FileConfigRepository, ProviderType};
use crate::modules::ConfigModule;
use crate::shared::AppResult;

#[derive(Parser, Debug)]
#[command(name = "chat-relay", author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding config.json and threads.json
    #[arg(long, env = "CHAT_RELAY_DATA_DIR", default_value = ".chat-relay")]
    pub data_dir: PathBuf,

    /// Config file path (defaults to <data-dir>/config.json)
    #[arg(short, long, env = "CHAT_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use the scripted provider instead of the HTTP API
    #[arg(long)]
    pub offline: bool,

    #[arg(long, env = "CHAT_RELAY_USERNAME", default_value = "admin")]
    pub username: String,

    #[arg(
        long,
        env = "CHAT_RELAY_PASSWORD",
        default_value = "admin",
        hide_env_values = true
    )]
    pub password: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start an interactive chat session (default)
    Chat(ChatArgs),
    /// List threads that are not deleted
    Threads {
        /// Only threads whose name or messages contain this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Print one thread with its steps
    Show { id: String },
    /// Soft-delete a thread
    Delete { id: String },
    /// List the models offered by the provider
    Models,
    /// Inspect or initialise the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// 加载配置、组装状态、认证并执行子命令
pub async fn run(cli: Cli) -> AppResult<()> {
    let config_module = match &cli.config {
        Some(path) => {
            ConfigModule::with_repository(Arc::new(FileConfigRepository::with_path(path.clone())))
        }
        None => ConfigModule::new_with_file(&cli.data_dir),
    };

    // 配置命令不需要登录，配置无效时也能重置
    if let Some(Command::Config { action }) = &cli.command {
        return run_config(&config_module, action).await;
    }

    let mut config = config_module.load().await?;
    if cli.offline {
        config.provider.provider_type = ProviderType::Scripted;
    }

    let state = Arc::new(AppState::initialize(config, &cli.data_dir).await?);
    let user = state.login(&cli.username, &cli.password).await?;
    tracing::info!("Logged in as {}", user.identifier);

    match cli.command.unwrap_or(Command::Chat(ChatArgs::default())) {
        Command::Chat(args) => run_chat(state, args).await,
        Command::Threads { search } => list_threads(&state, search).await,
        Command::Show { id } => show_thread(&state, &id).await,
        Command::Delete { id } => delete_thread(&state, &id).await,
        Command::Models => list_models(&state).await,
        Command::Config { action } => run_config(&config_module, &action).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_chat() {
        let cli = Cli::try_parse_from(["chat-relay", "--offline"]).unwrap();
        assert!(cli.offline);
        assert!(cli.command.is_none());
        assert_eq!(cli.data_dir, PathBuf::from(".chat-relay"));
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["chat-relay", "delete", "test1"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Delete { id }) if id == "test1"));

        let cli = Cli::try_parse_from([
            "chat-relay",
            "chat",
            "--resume",
            "test2",
            "--no-stream",
            "--temperature",
            "0.5",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Chat(args)) => {
                assert_eq!(args.resume.as_deref(), Some("test2"));
                assert!(args.no_stream);
                assert_eq!(args.temperature, Some(0.5));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["chat-relay", "config", "reset"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config { action: ConfigAction::Reset })
        ));
    }
}
