//! Groq 适配器（OpenAI 兼容格式）
//!
//! Groq 提供与 OpenAI 完全兼容的 chat completions 接口，
//! 通过 async_openai 调用。
//! - Base URL: https://api.groq.com/openai/v1
//! - 默认模型: llama-3.3-70b-versatile

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use super::traits::{ProviderError, TextGenerator};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq 客户端：API Key 优先取配置，缺省回落环境变量 `GROQ_API_KEY`
pub struct GroqClient {
    client: Client<OpenAIConfig>,
    model: String,
    configured: bool,
}

impl GroqClient {
    pub fn new(model: Option<&str>, api_key: Option<String>) -> Self {
        let api_key = api_key.or_else(|| std::env::var("GROQ_API_KEY").ok());
        let configured = api_key.is_some();

        let config = OpenAIConfig::new()
            .with_api_base(GROQ_BASE_URL)
            .with_api_key(api_key.unwrap_or_else(|| "sk-placeholder".to_string()));

        Self {
            client: Client::with_config(config),
            model: model.unwrap_or(GROQ_DEFAULT_MODEL).to_string(),
            configured,
        }
    }
}

#[async_trait]
impl TextGenerator for GroqClient {
    fn name(&self) -> &'static str {
        "groq"
    }

    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        if !self.configured {
            return Err(ProviderError::Unconfigured);
        }

        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(max_tokens)
            .temperature(temperature)
            .messages(vec![ChatCompletionRequestMessage::User(user_message)])
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| {
                let text = e.to_string();
                if text.contains("429") {
                    ProviderError::RateLimited
                } else {
                    ProviderError::Unavailable(text)
                }
            })?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("empty completion".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_unconfigured() {
        let client = GroqClient::new(None, None);
        if !client.configured {
            let err = client.generate("hi", 8, 0.0).await.unwrap_err();
            assert!(matches!(err, ProviderError::Unconfigured));
        }
    }
}
