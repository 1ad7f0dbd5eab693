//! Cohere 适配器
//!
//! 调用 Cohere v1 chat 端点（自有格式，走 reqwest）。
//! - Base URL: https://api.cohere.com/v1/chat
//! - 默认模型: command-r

use async_trait::async_trait;
use serde_json::json;

use super::traits::{ProviderError, TextGenerator};

const COHERE_CHAT_URL: &str = "https://api.cohere.com/v1/chat";
pub const COHERE_DEFAULT_MODEL: &str = "command-r";

/// Cohere 客户端：API Key 优先取配置，缺省回落环境变量 `COHERE_API_KEY`
pub struct CohereClient {
    http: reqwest::Client,
    model: String,
    api_key: Option<String>,
}

impl CohereClient {
    pub fn new(model: Option<&str>, api_key: Option<String>) -> Self {
        let api_key = api_key.or_else(|| std::env::var("COHERE_API_KEY").ok());
        Self {
            http: reqwest::Client::new(),
            model: model.unwrap_or(COHERE_DEFAULT_MODEL).to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for CohereClient {
    fn name(&self) -> &'static str {
        "cohere"
    }

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Unconfigured)?;

        let body = json!({
            "model": self.model,
            "message": prompt,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .http
            .post(COHERE_CHAT_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        value["text"]
            .as_str()
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::MalformedResponse("no text in response".into()))
    }
}
