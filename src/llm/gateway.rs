//! 多后端回退网关
//!
//! 按固定优先级顺序逐个尝试后端，首个成功即返回；单个后端超时或失败
//! 不重试、直接换下一个。全部失败时返回逐后端的失败原因聚合。
//! 回退是串行的：并行竞速会破坏「首个成功即胜」的语义。

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::traits::{ProviderError, TextGenerator};

/// 网关层失败：链上没有后端，或全部后端依次失败
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no text-generation provider configured")]
    NoProviders,

    #[error("all providers failed: {}", format_failures(.0))]
    AllProvidersFailed(Vec<(&'static str, ProviderError)>),
}

fn format_failures(failures: &[(&'static str, ProviderError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// 文本生成网关：持有有序后端列表与统一的单次请求超时
pub struct TextGateway {
    providers: Vec<Arc<dyn TextGenerator>>,
    request_timeout: Duration,
}

impl TextGateway {
    pub fn new(providers: Vec<Arc<dyn TextGenerator>>, request_timeout: Duration) -> Self {
        Self {
            providers,
            request_timeout,
        }
    }

    /// 链上后端名（按尝试顺序）
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 依序尝试每个后端，返回首个成功的完成文本
    ///
    /// 每次调用外面包一层网关超时：底层没有超时的后端挂起时，
    /// 不会无限期阻塞回退链。
    pub async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, GatewayError> {
        if self.providers.is_empty() {
            return Err(GatewayError::NoProviders);
        }

        let mut failures: Vec<(&'static str, ProviderError)> = Vec::new();

        for provider in &self.providers {
            let call = provider.generate(prompt, max_tokens, temperature);
            match tokio::time::timeout(self.request_timeout, call).await {
                Ok(Ok(text)) => {
                    tracing::debug!(provider = provider.name(), "completion succeeded");
                    return Ok(text);
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %err,
                        "provider failed, trying next"
                    );
                    failures.push((provider.name(), err));
                }
                Err(_) => {
                    tracing::warn!(provider = provider.name(), "provider timed out, trying next");
                    failures.push((provider.name(), ProviderError::Timeout));
                }
            }
        }

        Err(GatewayError::AllProvidersFailed(failures))
    }
}
