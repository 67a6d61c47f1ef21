use async_trait::async_trait;
use tracing::debug;

use super::super::{ApplicationError, CommandHandler};
use crate::modules::chat::domain::{PersistedUser, User};

/// 创建用户命令
#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub user: User,
}

impl CreateUserCommand {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

/// 创建用户命令处理器
///
/// 不做注册，直接回显持久化形式
pub struct CreateUserHandler {
    known_user: PersistedUser,
}

impl CreateUserHandler {
    pub fn new(known_user: PersistedUser) -> Self {
        Self { known_user }
    }
}

#[async_trait]
impl CommandHandler<CreateUserCommand, PersistedUser> for CreateUserHandler {
    async fn handle(&self, command: CreateUserCommand) -> Result<PersistedUser, ApplicationError> {
        debug!("Creating user {}", command.user.identifier);
        Ok(PersistedUser::new(
            self.known_user.id.clone(),
            command.user.identifier,
            self.known_user.created_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_user_echoes_identifier() {
        let handler = CreateUserHandler::new(PersistedUser::new("test", "admin", Utc::now()));

        let persisted = handler
            .handle(CreateUserCommand::new(User::new("admin")))
            .await
            .unwrap();

        assert_eq!(persisted.id, "test");
        assert_eq!(persisted.identifier, "admin");
    }
}
