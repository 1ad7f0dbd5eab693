//! 删除消解
//!
//! 把用户当前（未完成、从今天起往后一个窗口内）的事件连同真实 id 列进
//! 提示词，让生成器按标题关键词、日期/时间接近度或类型挑出要删的条目。
//! 返回的 id 先对照调用方提供的事件列表过滤（本来就只含本人事件），
//! 再以 (event_id, user_id) 成对调用存储删除，别人的 id 永远删不掉。

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::TextGateway;
use crate::store::{EventRecord, EventStore, StoreError};

use super::repair::extract_json_object;

/// 删除消解失败
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("all generation providers unavailable")]
    Unavailable,

    #[error("model output could not be parsed")]
    MalformedOutput,

    /// 没有任何事件被删除；按约定这是显式失败而不是静默成功
    #[error("no matching events found")]
    NoMatches,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct RawDeletePayload {
    #[serde(default)]
    delete_events: Vec<RawDeleteItem>,
}

#[derive(Debug, Deserialize)]
struct RawDeleteItem {
    id: i64,
    #[allow(dead_code)]
    title: Option<String>,
    #[allow(dead_code)]
    reason: Option<String>,
}

/// 删除消解器
pub struct DeletionResolver {
    gateway: Arc<TextGateway>,
}

impl DeletionResolver {
    pub fn new(gateway: Arc<TextGateway>) -> Self {
        Self { gateway }
    }

    /// 消解并执行删除，返回确认删除的事件标题
    pub async fn resolve_and_delete(
        &self,
        utterance: &str,
        user_id: i64,
        events: &[EventRecord],
        store: &dyn EventStore,
    ) -> Result<Vec<String>, DeleteError> {
        let prompt = build_prompt(utterance, events);

        let raw = self
            .gateway
            .complete(&prompt, 512, 0.0)
            .await
            .map_err(|err| {
                tracing::warn!(error = %err, "generation unavailable for deletion");
                DeleteError::Unavailable
            })?;

        let json = extract_json_object(&raw).ok_or(DeleteError::MalformedOutput)?;
        let payload: RawDeletePayload = serde_json::from_str(&json).map_err(|err| {
            tracing::warn!(error = %err, "deletion payload did not parse after repair");
            DeleteError::MalformedOutput
        })?;

        // 只接受调用方事件列表里真实存在的 id
        let known: HashMap<i64, &EventRecord> = events.iter().map(|e| (e.id, e)).collect();

        let mut deleted = Vec::new();
        for item in payload.delete_events {
            let Some(event) = known.get(&item.id) else {
                tracing::warn!(event_id = item.id, "model returned an unknown event id, skipping");
                continue;
            };
            if store.delete_event(item.id, user_id)? {
                deleted.push(event.title.clone());
            }
        }

        if deleted.is_empty() {
            return Err(DeleteError::NoMatches);
        }
        Ok(deleted)
    }
}

fn build_prompt(utterance: &str, events: &[EventRecord]) -> String {
    let mut listing = String::new();
    for event in events {
        listing.push_str(&format!(
            "- id {}: \"{}\" on {} at {} ({})\n",
            event.id, event.title, event.date, event.time, event.category
        ));
    }

    format!(
        r#"The user wants to cancel one or more scheduled events.
The user said: "{utterance}"

These are the user's upcoming events:
{listing}
Select every event the user is asking to delete. Match by title keywords,
by date or time proximity, or by the type of event.

Return ONLY a JSON object in this exact format:
{{"delete_events": [{{"id": 1, "title": "Event title", "reason": "title match"}}]}}

If nothing matches, return {{"delete_events": []}}."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockGenerator, ProviderError};
    use crate::store::{NewEvent, SqliteStore};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use std::time::Duration;

    fn gateway_of(mock: MockGenerator) -> Arc<TextGateway> {
        Arc::new(TextGateway::new(
            vec![Arc::new(mock)],
            Duration::from_secs(1),
        ))
    }

    fn seed(store: &SqliteStore, user_id: i64, title: &str) -> i64 {
        let date: NaiveDate = "2025-09-30".parse().expect("test date");
        store
            .insert_event(&NewEvent {
                user_id,
                title: title.to_string(),
                description: String::new(),
                category: "health".to_string(),
                date,
                time: "14:00".to_string(),
                reminder_setting: "15 minutes".to_string(),
                reminder_datetime: NaiveDateTime::new(
                    date,
                    NaiveTime::from_hms_opt(13, 45, 0).expect("test time"),
                ),
            })
            .expect("seed event")
    }

    fn upcoming(store: &SqliteStore, user_id: i64) -> Vec<EventRecord> {
        store
            .query_events(user_id, "2025-09-29".parse().unwrap(), None, Some(false))
            .expect("query events")
    }

    #[tokio::test]
    async fn test_deletes_only_listed_ids() {
        let store = SqliteStore::in_memory().unwrap();
        let mine = seed(&store, 1, "Dentist appointment");
        let theirs = seed(&store, 2, "Dentist appointment");

        // 模型同时报了本人的 id 和别人的 id
        let reply = format!(
            r#"{{"delete_events": [{{"id": {mine}, "title": "Dentist appointment", "reason": "title match"}},
                                   {{"id": {theirs}, "title": "Dentist appointment", "reason": "title match"}}]}}"#
        );
        let resolver = DeletionResolver::new(gateway_of(MockGenerator::new().respond(reply)));

        let events = upcoming(&store, 1);
        let deleted = resolver
            .resolve_and_delete("cancel my dentist appointment", 1, &events, &store)
            .await
            .unwrap();

        assert_eq!(deleted, vec!["Dentist appointment".to_string()]);
        // 别人的事件原样还在
        assert_eq!(upcoming(&store, 2).len(), 1);
        assert!(upcoming(&store, 1).is_empty());
    }

    #[tokio::test]
    async fn test_zero_matches_is_failure() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store, 1, "Lunch");
        let resolver = DeletionResolver::new(gateway_of(
            MockGenerator::new().respond(r#"{"delete_events": []}"#),
        ));

        let events = upcoming(&store, 1);
        let err = resolver
            .resolve_and_delete("cancel my flight", 1, &events, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::NoMatches));
        assert_eq!(upcoming(&store, 1).len(), 1);
    }

    #[tokio::test]
    async fn test_gateway_down_is_unavailable() {
        let store = SqliteStore::in_memory().unwrap();
        seed(&store, 1, "Lunch");
        let resolver = DeletionResolver::new(gateway_of(
            MockGenerator::new().fail(ProviderError::Timeout),
        ));

        let events = upcoming(&store, 1);
        let err = resolver
            .resolve_and_delete("cancel lunch", 1, &events, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteError::Unavailable));
    }

    #[tokio::test]
    async fn test_repairs_truncated_payload() {
        let store = SqliteStore::in_memory().unwrap();
        let id = seed(&store, 1, "Lunch");
        // 截断：缺收尾括号
        let reply = format!(
            "{{\n\"delete_events\": [\n{{\"id\": {id}, \"title\": \"Lunch\", \"reason\": \"title match\"}}\n]\n"
        );
        let resolver = DeletionResolver::new(gateway_of(MockGenerator::new().respond(reply)));

        let events = upcoming(&store, 1);
        let deleted = resolver
            .resolve_and_delete("cancel lunch", 1, &events, &store)
            .await
            .unwrap();
        assert_eq!(deleted, vec!["Lunch".to_string()]);
    }

    #[test]
    fn test_prompt_lists_real_ids() {
        let events = vec![EventRecord {
            id: 42,
            title: "Lunch".to_string(),
            description: String::new(),
            category: "social".to_string(),
            date: "2025-09-30".parse().unwrap(),
            time: "13:00".to_string(),
            done: false,
        }];
        let prompt = build_prompt("cancel lunch", &events);
        assert!(prompt.contains("id 42"));
        assert!(prompt.contains("delete_events"));
    }
}
