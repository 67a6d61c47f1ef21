use async_trait::async_trait;

use super::super::{ApplicationError, QueryHandler};
use crate::modules::chat::domain::PersistedUser;

/// 获取用户查询
#[derive(Debug, Clone)]
pub struct GetUserQuery {
    pub identifier: String,
}

impl GetUserQuery {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

/// 获取用户查询处理器
///
/// 只有一个隐式用户：返回的记录沿用它的 ID 和创建时间，标识取自查询
pub struct GetUserHandler {
    known_user: PersistedUser,
}

impl GetUserHandler {
    pub fn new(known_user: PersistedUser) -> Self {
        Self { known_user }
    }
}

#[async_trait]
impl QueryHandler<GetUserQuery, PersistedUser> for GetUserHandler {
    async fn handle(&self, query: GetUserQuery) -> Result<PersistedUser, ApplicationError> {
        Ok(PersistedUser::new(
            self.known_user.id.clone(),
            query.identifier,
            self.known_user.created_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_get_user_always_succeeds() {
        let created_at = Utc::now();
        let handler = GetUserHandler::new(PersistedUser::new("test", "admin", created_at));

        let user = handler.handle(GetUserQuery::new("someone")).await.unwrap();
        assert_eq!(user.id, "test");
        assert_eq!(user.identifier, "someone");
        assert_eq!(user.created_at, created_at);
    }
}
