use async_trait::async_trait;
use tracing::{info, warn};

use super::Authenticator;
use crate::modules::chat::User;
use crate::modules::config::AuthConfig;

/// 单一凭据的密码认证器
#[derive(Debug, Clone)]
pub struct PasswordAuthenticator {
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl Default for PasswordAuthenticator {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        if username == self.username && password == self.password {
            info!("User {} authenticated", username);
            Some(User::new(username))
        } else {
            warn!("Authentication rejected for {}", username);
            None
        }
    }
}
