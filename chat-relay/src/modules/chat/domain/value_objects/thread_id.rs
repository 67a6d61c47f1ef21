use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 会话线程唯一标识符
///
/// 值对象：通过值而非引用比较，不可变。
/// 外部传入的标识（例如 "test1"）原样保留，不要求是 UUID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// 生成新的线程 ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 获取字符串形式
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<ThreadId> for String {
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_keeps_external_value() {
        let id = ThreadId::from("test1");
        assert_eq!(id.as_str(), "test1");
        assert_eq!(id.to_string(), "test1");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ThreadId::new(), ThreadId::new());
    }

    #[test]
    fn test_thread_id_serializes_transparently() {
        let json = serde_json::to_string(&ThreadId::from("test2")).unwrap();
        assert_eq!(json, "\"test2\"");
    }
}
