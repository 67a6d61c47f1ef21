// Config Commands
//
// 查看、初始化与重置配置文件

use clap::Subcommand;

use crate::modules::ConfigModule;
use crate::shared::AppResult;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Print the effective configuration (file plus environment overrides)
    Show,
    /// Write the default configuration if none is saved yet
    Init,
    /// Overwrite the saved configuration with defaults
    Reset,
}

pub async fn run_config(module: &ConfigModule, action: &ConfigAction) -> AppResult<()> {
    match action {
        ConfigAction::Show => {
            let mut config = module.load().await?;
            if !config.provider.api_key.is_empty() {
                config.provider.api_key = "********".to_string();
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Init => {
            if module.init().await? {
                println!("Wrote default configuration");
            } else {
                println!("Configuration already exists");
            }
        }
        ConfigAction::Reset => {
            module.reset().await?;
            println!("Configuration reset to defaults");
        }
    }
    Ok(())
}
