//! Mock 文本生成器（用于测试，无需 API）
//!
//! 按脚本顺序吐出预设的成功/失败结果，并记录收到的 Prompt，
//! 便于断言流水线发出的提示词与回退行为。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{ProviderError, TextGenerator};

enum ScriptEntry {
    Reply(String),
    Fail(ProviderError),
}

/// 脚本化 Mock：每次 generate 消费脚本中的下一条
pub struct MockGenerator {
    name: &'static str,
    script: Mutex<VecDeque<ScriptEntry>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::named("mock")
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// 追加一条成功响应
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(ScriptEntry::Reply(text.into()));
        self
    }

    /// 追加一条失败
    pub fn fail(self, err: ProviderError) -> Self {
        self.script
            .lock()
            .expect("mock script lock")
            .push_back(ScriptEntry::Fail(err));
        self
    }

    /// 每次调用前先等待指定时长（配合网关超时测试）
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 已收到的全部 Prompt
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("mock prompts lock").clone()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, ProviderError> {
        self.prompts
            .lock()
            .expect("mock prompts lock")
            .push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self
            .script
            .lock()
            .expect("mock script lock")
            .pop_front()
        {
            Some(ScriptEntry::Reply(text)) => Ok(text),
            Some(ScriptEntry::Fail(err)) => Err(err),
            None => Err(ProviderError::Unavailable("mock script exhausted".into())),
        }
    }
}
