//! 提交编排：分类 → 抽取/消解 → 冲突检查 → 持久化
//!
//! 单消息、单请求内同步推进的状态机。待确认冲突是调用方持有的
//! 单槽会话态：裸确认词直接提交挂起草稿（跳过二次冲突检查），
//! 裸否定词清槽取消；批次内首个冲突即中断，之前的草稿已提交、
//! 之后的草稿丢弃（不排队），并在回复里把两者都说清楚。

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::clock;
use crate::llm::TextGateway;
use crate::store::{EventStore, NewEvent, StoreError};

use super::conflict::{build_warning, find_conflicts};
use super::delete::{DeleteError, DeletionResolver};
use super::extract::{fallback_extract, EventExtractor, ExtractError};
use super::intent::{ClassifyError, Intent, IntentClassifier};
use super::types::{parse_hhmm, EventDraft, PendingConflict, ProcessOutcome};

const CONFIRM_TOKENS: [&str; 4] = ["yes", "y", "confirm", "ok"];
const REJECT_TOKENS: [&str; 4] = ["no", "n", "cancel", "nevermind"];

const SERVICE_UNAVAILABLE: &str =
    "The assistant is unavailable right now. Please try again in a moment.";
const NOTHING_PENDING: &str = "There is nothing awaiting confirmation.";

/// 日程助理：一次消息处理的入口
pub struct ScheduleAssistant {
    store: Arc<dyn EventStore>,
    classifier: IntentClassifier,
    extractor: EventExtractor,
    resolver: DeletionResolver,
    /// 删除消解向前查询日程的天数窗口
    lookahead_days: i64,
}

impl ScheduleAssistant {
    pub fn new(gateway: Arc<TextGateway>, store: Arc<dyn EventStore>, lookahead_days: i64) -> Self {
        Self {
            classifier: IntentClassifier::new(gateway.clone()),
            extractor: EventExtractor::new(gateway.clone()),
            resolver: DeletionResolver::new(gateway),
            store,
            lookahead_days,
        }
    }

    /// 处理一条消息；pending 是调用方（会话层）在多次调用间保存的单槽状态
    pub async fn process_message(
        &self,
        user_id: i64,
        utterance: &str,
        pending: &mut Option<PendingConflict>,
    ) -> ProcessOutcome {
        self.process_message_at(user_id, utterance, pending, clock::ist_now())
            .await
    }

    /// 同上，但注入「当前时刻」（测试用）
    pub async fn process_message_at(
        &self,
        user_id: i64,
        utterance: &str,
        pending: &mut Option<PendingConflict>,
        now: DateTime<FixedOffset>,
    ) -> ProcessOutcome {
        let trimmed = utterance.trim();

        if is_confirmation(trimmed) {
            return self.confirm_pending(user_id, pending);
        }
        if is_rejection(trimmed) {
            return reject_pending(user_id, pending);
        }

        let today = now.date_naive();
        let intent = match self.classifier.classify(trimmed, today).await {
            Ok(intent) => intent,
            Err(ClassifyError::GatewayUnavailable(err)) => {
                // 所有后端都不可用：降级到确定性模式抽取
                tracing::warn!(error = %err, "classification gateway down, degrading to patterns");
                let drafts = fallback_extract(trimmed, today);
                if drafts.is_empty() {
                    return ProcessOutcome::failure(SERVICE_UNAVAILABLE);
                }
                return self.commit_batch(user_id, drafts, pending);
            }
            Err(ClassifyError::UnrecognizedResponse) => {
                return ProcessOutcome::failure(SERVICE_UNAVAILABLE);
            }
        };

        match intent {
            Intent::NoEvents => {
                ProcessOutcome::reply("Noted! Tell me when you want to schedule something.")
            }
            Intent::Question => ProcessOutcome::reply(
                "I can create or cancel events from your messages. \
                 Try something like \"lunch with Sam tomorrow at 1pm\".",
            ),
            Intent::DeleteEvents => self.delete_flow(user_id, trimmed, today).await,
            Intent::EventsFound => match self.extractor.extract(trimmed, now).await {
                Ok(drafts) if drafts.is_empty() => {
                    ProcessOutcome::reply("I didn't find any events to add in that message.")
                }
                Ok(drafts) => self.commit_batch(user_id, drafts, pending),
                Err(ExtractError::Unavailable) => ProcessOutcome::failure(SERVICE_UNAVAILABLE),
                Err(ExtractError::MalformedOutput) => ProcessOutcome::failure(
                    "I couldn't make sense of the events in that message. Could you rephrase it?",
                ),
            },
        }
    }

    /// 裸确认：提交挂起草稿（不再做冲突检查），清槽
    fn confirm_pending(
        &self,
        user_id: i64,
        pending: &mut Option<PendingConflict>,
    ) -> ProcessOutcome {
        match pending.take() {
            Some(slot) if slot.user_id == user_id => match self.commit_draft(user_id, &slot.draft) {
                Ok(_) => {
                    let draft = slot.draft;
                    ProcessOutcome {
                        success: true,
                        message: format!(
                            "Added \"{}\" on {} at {}.",
                            draft.title, draft.date, draft.time
                        ),
                        events_created: true,
                        conflict_detected: false,
                        created_count: 1,
                        deleted_titles: Vec::new(),
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to persist confirmed draft");
                    ProcessOutcome::failure("Something went wrong while saving that event.")
                }
            },
            Some(other) => {
                // 槽属于别的用户会话，原样放回
                *pending = Some(other);
                ProcessOutcome::reply(NOTHING_PENDING)
            }
            None => ProcessOutcome::reply(NOTHING_PENDING),
        }
    }

    /// 逐条提交草稿；首个冲突中断批次并占据挂起槽
    fn commit_batch(
        &self,
        user_id: i64,
        drafts: Vec<EventDraft>,
        pending: &mut Option<PendingConflict>,
    ) -> ProcessOutcome {
        let total = drafts.len();
        let mut created: Vec<String> = Vec::new();
        let mut persist_failures = 0usize;

        for (index, draft) in drafts.into_iter().enumerate() {
            let existing = match self.store.query_events(
                user_id,
                draft.date,
                Some(draft.date),
                Some(false),
            ) {
                Ok(events) => events,
                Err(err) => {
                    tracing::error!(error = %err, "failed to read schedule for conflict check");
                    return ProcessOutcome::failure(
                        "Something went wrong while reading your schedule.",
                    );
                }
            };

            let conflicts = find_conflicts(&draft.time, &existing);
            if !conflicts.is_empty() {
                let warning = build_warning(&draft, &conflicts);
                let mut message = String::new();
                if !created.is_empty() {
                    message.push_str(&format!(
                        "Added {} event(s): {}. ",
                        created.len(),
                        created.join(", ")
                    ));
                }
                let dropped = total - index - 1;
                if dropped > 0 {
                    message.push_str(&format!(
                        "{} remaining event(s) from this message were not added. ",
                        dropped
                    ));
                }
                message.push_str(&warning);

                let created_count = created.len();
                *pending = Some(PendingConflict { user_id, draft });
                return ProcessOutcome {
                    success: true,
                    message,
                    events_created: created_count > 0,
                    conflict_detected: true,
                    created_count,
                    deleted_titles: Vec::new(),
                };
            }

            match self.commit_draft(user_id, &draft) {
                Ok(_) => created.push(draft.title),
                Err(err) => {
                    // 只放弃当前条目，之前已提交的保持不变
                    tracing::error!(error = %err, title = %draft.title, "failed to persist draft");
                    persist_failures += 1;
                }
            }
        }

        if created.is_empty() {
            return ProcessOutcome::failure(
                "I couldn't save those events. Please try again in a moment.",
            );
        }

        let mut message = format!("Added {} event(s): {}.", created.len(), created.join(", "));
        if persist_failures > 0 {
            message.push_str(&format!(" {} event(s) could not be saved.", persist_failures));
        }
        ProcessOutcome {
            success: true,
            message,
            events_created: true,
            conflict_detected: false,
            created_count: created.len(),
            deleted_titles: Vec::new(),
        }
    }

    /// 写入一条草稿；reminder_datetime = 事件时刻 - 提醒偏移
    fn commit_draft(&self, user_id: i64, draft: &EventDraft) -> Result<i64, StoreError> {
        let time = parse_hhmm(&draft.time).unwrap_or_else(|| {
            tracing::error!(time = %draft.time, "draft time invariant violated, using 09:00");
            NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
        });
        let moment = NaiveDateTime::new(draft.date, time);

        self.store.insert_event(&NewEvent {
            user_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category.as_str().to_string(),
            date: draft.date,
            time: draft.time.clone(),
            reminder_setting: draft.reminder.label(),
            reminder_datetime: moment - draft.reminder.to_duration(),
        })
    }

    async fn delete_flow(&self, user_id: i64, utterance: &str, today: NaiveDate) -> ProcessOutcome {
        let to = today + Duration::days(self.lookahead_days);
        let events = match self.store.query_events(user_id, today, Some(to), Some(false)) {
            Ok(events) => events,
            Err(err) => {
                tracing::error!(error = %err, "failed to read schedule for deletion");
                return ProcessOutcome::failure(
                    "Something went wrong while reading your schedule.",
                );
            }
        };

        if events.is_empty() {
            return ProcessOutcome::failure("You have no upcoming events to cancel.");
        }

        match self
            .resolver
            .resolve_and_delete(utterance, user_id, &events, self.store.as_ref())
            .await
        {
            Ok(titles) => {
                let message = format!(
                    "Cancelled {} event(s): {}.",
                    titles.len(),
                    titles.join(", ")
                );
                ProcessOutcome {
                    success: true,
                    message,
                    events_created: false,
                    conflict_detected: false,
                    created_count: 0,
                    deleted_titles: titles,
                }
            }
            Err(DeleteError::NoMatches) => ProcessOutcome::failure(
                "I couldn't find any upcoming events matching that request.",
            ),
            Err(DeleteError::Unavailable) => ProcessOutcome::failure(SERVICE_UNAVAILABLE),
            Err(DeleteError::MalformedOutput) => ProcessOutcome::failure(
                "I couldn't work out which events to cancel. Could you rephrase?",
            ),
            Err(DeleteError::Store(err)) => {
                tracing::error!(error = %err, "store error during deletion");
                ProcessOutcome::failure("Something went wrong while updating your schedule.")
            }
        }
    }
}

fn normalize_token(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase()
}

fn is_confirmation(text: &str) -> bool {
    CONFIRM_TOKENS.contains(&normalize_token(text).as_str())
}

fn is_rejection(text: &str) -> bool {
    REJECT_TOKENS.contains(&normalize_token(text).as_str())
}

/// 裸否定：清槽、不落盘
fn reject_pending(user_id: i64, pending: &mut Option<PendingConflict>) -> ProcessOutcome {
    match pending.take() {
        Some(slot) if slot.user_id == user_id => ProcessOutcome::reply(format!(
            "Okay, I won't add \"{}\".",
            slot.draft.title
        )),
        Some(other) => {
            *pending = Some(other);
            ProcessOutcome::reply(NOTHING_PENDING)
        }
        None => ProcessOutcome::reply(NOTHING_PENDING),
    }
}
