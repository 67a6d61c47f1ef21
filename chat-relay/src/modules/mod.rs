// Modules Layer - 业务模块
//
// 按照六边形架构组织的业务模块：
// - auth: 用户名密码认证
// - chat: 线程存储、步骤记录与会话中继
// - config: 配置模块，处理应用设置

pub mod auth;
pub mod chat;
pub mod config;

pub use auth::{Authenticator, PasswordAuthenticator};
pub use chat::ChatModule;
pub use config::ConfigModule;
