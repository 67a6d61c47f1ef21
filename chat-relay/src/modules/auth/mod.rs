// Auth Module
//
// 演示用的密码认证：与一组配置的凭据做字面比较，不是真正的认证

mod password;

pub use password::*;

use async_trait::async_trait;

use crate::modules::chat::User;

/// 认证端口
///
/// 返回 `None` 表示拒绝，由调用方决定如何呈现
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Option<User>;
}
