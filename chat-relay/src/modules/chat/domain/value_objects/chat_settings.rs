use serde::{Deserialize, Serialize};

/// 温度允许的最小值
pub const MIN_TEMPERATURE: f32 = 0.0;
/// 温度允许的最大值
pub const MAX_TEMPERATURE: f32 = 2.0;
/// 默认温度
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// 设置校验错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("temperature {0} is outside [0, 2]")]
    TemperatureOutOfRange(f32),

    #[error("model identifier must not be empty")]
    EmptyModel,

    #[error("model {0} is not offered by the provider")]
    UnknownModel(String),

    #[error("provider offered no models")]
    NoModelsAvailable,
}

/// 会话级生成设置
///
/// 值对象：模型、是否流式输出、温度。每次生成开始时读取一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedSettings")]
pub struct ChatSettings {
    model: String,
    stream: bool,
    temperature: f32,
}

/// 反序列化的中间形式，经 `ChatSettings::new` 校验后才成为设置
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedSettings {
    model: String,
    stream: bool,
    temperature: f32,
}

impl TryFrom<UncheckedSettings> for ChatSettings {
    type Error = SettingsError;

    fn try_from(raw: UncheckedSettings) -> Result<Self, Self::Error> {
        ChatSettings::new(raw.model, raw.stream, raw.temperature)
    }
}

impl ChatSettings {
    /// 创建并校验设置（不校验模型目录）
    pub fn new(
        model: impl Into<String>,
        stream: bool,
        temperature: f32,
    ) -> Result<Self, SettingsError> {
        let settings = Self {
            model: model.into(),
            stream,
            temperature,
        };
        settings.validate(&[])?;
        Ok(settings)
    }

    /// 根据模型目录生成默认设置（第一个模型为默认选择）
    pub fn from_catalogue(models: &[String]) -> Result<Self, SettingsError> {
        let model = models.first().ok_or(SettingsError::NoModelsAvailable)?;
        Self::new(model.clone(), true, DEFAULT_TEMPERATURE)
    }

    /// 校验设置
    ///
    /// `catalogue` 为空时跳过模型成员检查
    pub fn validate(&self, catalogue: &[String]) -> Result<(), SettingsError> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(SettingsError::TemperatureOutOfRange(self.temperature));
        }
        if self.model.trim().is_empty() {
            return Err(SettingsError::EmptyModel);
        }
        if !catalogue.is_empty() && !catalogue.iter().any(|m| m == &self.model) {
            return Err(SettingsError::UnknownModel(self.model.clone()));
        }
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}
