use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已认证用户（认证回调的返回值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub identifier: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl User {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            metadata: serde_json::json!({}),
        }
    }
}

/// 持久化用户记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedUser {
    pub id: String,
    pub identifier: String,
    pub created_at: DateTime<Utc>,
}

impl PersistedUser {
    pub fn new(
        id: impl Into<String>,
        identifier: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
            created_at,
        }
    }
}
