// Chat Domain Layer
// 领域层包含业务实体与值对象

pub mod entities;
pub mod value_objects;

// 重导出常用类型
pub use entities::{
    HistoryMessage, MessageRole, PersistedUser, SessionHistory, Step, StepType, Thread,
    ThreadMetadata, User,
};
pub use value_objects::{
    ChatSettings, SettingsError, StepId, ThreadId, DEFAULT_TEMPERATURE, MAX_TEMPERATURE,
    MIN_TEMPERATURE,
};
