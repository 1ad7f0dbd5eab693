//! Google Gemini 适配器
//!
//! 直接调用 generateContent REST 端点（非 OpenAI 格式，走 reqwest）。
//! - Base URL: https://generativelanguage.googleapis.com/v1beta/models
//! - 默认模型: gemini-2.0-flash

use async_trait::async_trait;
use serde_json::json;

use super::traits::{ProviderError, TextGenerator};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini 客户端：API Key 优先取配置，缺省回落环境变量 `GOOGLE_GEMINI_API_KEY`
pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(model: Option<&str>, api_key: Option<String>) -> Self {
        let api_key = api_key.or_else(|| std::env::var("GOOGLE_GEMINI_API_KEY").ok());
        Self {
            http: reqwest::Client::new(),
            model: model.unwrap_or(GEMINI_DEFAULT_MODEL).to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Unconfigured)?;

        let url = format!("{}/{}:generateContent?key={}", GEMINI_BASE_URL, self.model, api_key);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": temperature,
            }
        });

        let response = self
            .http
            .post(&url)
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

        value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("no candidate text in response".into())
            })
    }
}
