use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::value_objects::ThreadId;
use super::{PersistedUser, Step};

/// 线程元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ThreadMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            tags: Vec::new(),
        }
    }
}

/// 线程实体 - 聚合根
///
/// 一段持久化的对话，按顺序持有 Step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    id: ThreadId,
    created_at: DateTime<Utc>,
    user: PersistedUser,
    #[serde(default)]
    metadata: ThreadMetadata,
    #[serde(default)]
    steps: Vec<Step>,
}

impl Thread {
    /// 创建空线程
    pub fn new(id: ThreadId, user: PersistedUser, metadata: ThreadMetadata) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            user,
            metadata,
            steps: Vec::new(),
        }
    }

    /// 指定创建时间
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// 批量追加步骤（用于种子数据）
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    // Getters
    pub fn id(&self) -> &ThreadId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn user(&self) -> &PersistedUser {
        &self.user
    }

    pub fn metadata(&self) -> &ThreadMetadata {
        &self.metadata
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// 显示名称，未命名时退回到线程 ID
    pub fn name(&self) -> &str {
        self.metadata
            .name
            .as_deref()
            .unwrap_or_else(|| self.id.as_str())
    }

    /// 追加步骤
    ///
    /// 同一线程内步骤 ID 唯一，重复 ID 返回 false 且不修改线程
    pub fn push_step(&mut self, step: Step) -> bool {
        if self.steps.iter().any(|s| s.id() == step.id()) {
            return false;
        }
        self.steps.push(step);
        true
    }

    /// 是否匹配搜索关键字（名称或步骤内容，不区分大小写）
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.name().to_lowercase().contains(&keyword)
            || self
                .steps
                .iter()
                .any(|s| s.output().to_lowercase().contains(&keyword))
    }
}
