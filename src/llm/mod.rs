//! 文本生成层：网关与后端适配器（Gemini / Groq / Cohere / Mock）

pub mod cohere;
pub mod gateway;
pub mod gemini;
pub mod groq;
pub mod mock;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use cohere::CohereClient;
pub use gateway::{GatewayError, TextGateway};
pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use mock::MockGenerator;
pub use traits::{ProviderError, TextGenerator};

use crate::config::AppConfig;

/// 按配置的优先级顺序构建网关；未知后端名记日志并跳过。
///
/// 未配置 API Key 的后端仍留在链上：调用时返回 `Unconfigured`，
/// 让「全部后端不可用」的聚合信息保持准确。
pub fn build_gateway_from_config(cfg: &AppConfig) -> TextGateway {
    let mut providers: Vec<Arc<dyn TextGenerator>> = Vec::new();

    for name in &cfg.llm.providers {
        match name.as_str() {
            "gemini" => providers.push(Arc::new(GeminiClient::new(
                cfg.llm.gemini.model.as_deref(),
                cfg.llm.gemini.api_key.clone(),
            ))),
            "groq" => providers.push(Arc::new(GroqClient::new(
                cfg.llm.groq.model.as_deref(),
                cfg.llm.groq.api_key.clone(),
            ))),
            "cohere" => providers.push(Arc::new(CohereClient::new(
                cfg.llm.cohere.model.as_deref(),
                cfg.llm.cohere.api_key.clone(),
            ))),
            other => tracing::warn!(provider = other, "unknown provider in config, skipping"),
        }
    }

    TextGateway::new(
        providers,
        Duration::from_secs(cfg.llm.request_timeout_secs),
    )
}
