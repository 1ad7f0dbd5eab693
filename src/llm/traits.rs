//! 文本生成客户端抽象
//!
//! 所有后端（Gemini / Groq / Cohere / Mock）实现 TextGenerator：
//! 提交一段 Prompt，返回完成文本或带类型的失败原因。

use async_trait::async_trait;
use thiserror::Error;

/// 单个后端调用的失败原因；网关据此聚合「全部不可用」的报告
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 缺少 API Key，本后端从未真正可用
    #[error("provider not configured (missing API key)")]
    Unconfigured,

    /// 网络或服务端错误
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    /// 响应结构不含可用文本
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// 文本生成 trait：一次 Prompt 对应一次完成，无跨调用状态
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 后端名（用于日志与失败聚合）
    fn name(&self) -> &'static str;

    /// 提交 Prompt，返回完成文本
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ProviderError>;
}
