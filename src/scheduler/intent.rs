//! 意图分类
//!
//! 用封闭词表提示词让生成器输出四个字面量之一；任何对不上的回复或
//! 网关失败都归为分类失败。NO_EVENTS 与 QUESTION 会让流水线无副作用地
//! 短路。

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::llm::{GatewayError, TextGateway};

/// 一条用户消息表达的日历意图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// 描述了一个或多个待创建事件
    EventsFound,
    /// 要求删除已有事件
    DeleteEvents,
    /// 没有可操作的日历意图
    NoEvents,
    /// 是一个提问
    Question,
}

/// 分类失败原因；网关整体不可用与回复对不上词表分开，
/// 前者允许编排器降级到模式回退抽取
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("all generation providers unavailable")]
    GatewayUnavailable(#[source] GatewayError),

    #[error("classifier response did not match the closed vocabulary")]
    UnrecognizedResponse,
}

/// 意图分类器
pub struct IntentClassifier {
    gateway: Arc<TextGateway>,
}

impl IntentClassifier {
    pub fn new(gateway: Arc<TextGateway>) -> Self {
        Self { gateway }
    }

    /// 对单条消息分类
    pub async fn classify(
        &self,
        utterance: &str,
        today: NaiveDate,
    ) -> Result<Intent, ClassifyError> {
        let prompt = build_prompt(utterance, today);

        let response = self
            .gateway
            .complete(&prompt, 16, 0.0)
            .await
            .map_err(ClassifyError::GatewayUnavailable)?;

        match parse_intent_token(&response) {
            Some(intent) => Ok(intent),
            None => {
                tracing::warn!(response = %response.trim(), "unrecognized intent token");
                Err(ClassifyError::UnrecognizedResponse)
            }
        }
    }
}

fn build_prompt(utterance: &str, today: NaiveDate) -> String {
    format!(
        r#"You are an intent classifier for a schedule assistant.
Today's date is {date} ({weekday}).
Decide what the user's message expresses.

Output ONLY one of these tokens (no explanation):
- EVENTS_FOUND: the message describes one or more calendar events to create
- DELETE_EVENTS: the message asks to cancel or remove existing scheduled events
- NO_EVENTS: the message contains no actionable calendar operation
- QUESTION: the message is a question

User message: "{utterance}""#,
        date = today.format("%Y-%m-%d"),
        weekday = today.weekday(),
    )
}

/// 取回复的首个词元，去掉标点后与四个字面量比对
fn parse_intent_token(response: &str) -> Option<Intent> {
    let token = response
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .to_uppercase();

    match token.as_str() {
        "EVENTS_FOUND" => Some(Intent::EventsFound),
        "DELETE_EVENTS" => Some(Intent::DeleteEvents),
        "NO_EVENTS" => Some(Intent::NoEvents),
        "QUESTION" => Some(Intent::Question),
        _ => None,
    }
}
