use async_trait::async_trait;

/// 会话输出端口
///
/// 宿主框架提供的 UI 接收端：逐 token 推送、推送完整消息、推送错误
#[async_trait]
pub trait ChatOutputPort: Send + Sync {
    /// 推送一个流式 token
    async fn deliver_token(&self, session_id: &str, token: &str);

    /// 推送一条完整消息
    async fn deliver_message(&self, session_id: &str, author: &str, content: &str);

    /// 推送生成错误
    async fn deliver_error(&self, session_id: &str, error: &str);
}
