//! 事件抽取
//!
//! 创建意图的消息经提示词抽取为结构化草稿列表：网关返回的 JSON 先过
//! 边界/截断修复，再逐条后处理（日期重新修正、时间矫正、类别与提醒
//! 兜底）。网关整体不可用时降级到确定性的模式回退抽取，保证流水线
//! 只是功能降级而不是硬失败。

use std::sync::Arc;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Weekday};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::llm::TextGateway;

use super::normalize::normalize_event_date;
use super::repair::extract_json_object;
use super::types::{parse_hhmm, Category, EventDraft, ReminderOffset};

/// 抽取失败
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 网关不可用且模式回退也一无所获
    #[error("all generation providers unavailable")]
    Unavailable,

    /// 修复后仍无法解析的模型输出；不会从中持久化任何残缺事件
    #[error("model output could not be parsed")]
    MalformedOutput,
}

/// 生成器返回的原始事件负载（字段全部宽容为可缺省）
#[derive(Debug, Deserialize)]
struct RawPayload {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    date: Option<String>,
    time: Option<String>,
    reminder: Option<String>,
}

/// 事件抽取器
pub struct EventExtractor {
    gateway: Arc<TextGateway>,
}

impl EventExtractor {
    pub fn new(gateway: Arc<TextGateway>) -> Self {
        Self { gateway }
    }

    /// 从一条创建意图的消息抽取事件草稿（可能为空列表）
    pub async fn extract(
        &self,
        utterance: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<EventDraft>, ExtractError> {
        let today = now.date_naive();
        let prompt = build_prompt(utterance, now);

        let raw = match self.gateway.complete(&prompt, 1024, 0.2).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "generation unavailable, using pattern fallback");
                let drafts = fallback_extract(utterance, today);
                if drafts.is_empty() {
                    return Err(ExtractError::Unavailable);
                }
                return Ok(drafts);
            }
        };

        let json = extract_json_object(&raw).ok_or(ExtractError::MalformedOutput)?;
        let payload: RawPayload = serde_json::from_str(&json).map_err(|err| {
            tracing::warn!(error = %err, "extraction payload did not parse after repair");
            ExtractError::MalformedOutput
        })?;

        Ok(payload
            .events
            .into_iter()
            .filter_map(|raw| finalize_draft(raw, utterance, today, now))
            .collect())
    }
}

fn build_prompt(utterance: &str, now: DateTime<FixedOffset>) -> String {
    format!(
        r#"Analyze the user's message and extract every calendar event it describes.
The user said: "{utterance}"

Return ONLY a JSON object in this exact format:
{{
  "events": [
    {{
      "title": "Event title",
      "description": "Event description",
      "category": "personal",
      "date": "YYYY-MM-DD",
      "time": "HH:MM",
      "reminder": "15 minutes"
    }}
  ]
}}

Rules:
1. Today's date is {date} ({weekday}) and the current time is {time}.
2. Resolve relative dates ("tomorrow", weekday names, "on 5") against today's date.
3. The time must be a valid 24-hour HH:MM. Never output "unset", "TBD" or an empty time; if no time is mentioned, choose a reasonable one like "09:00".
4. The category must be one of: {categories}. Default to "personal".
5. For the reminder field use values like "15 minutes", "30 minutes", "1 hour", "2 hours" or "1 day". Default to "15 minutes".
6. If the message describes no events, return {{"events": []}}."#,
        date = now.format("%Y-%m-%d"),
        weekday = now.date_naive().weekday(),
        time = now.format("%H:%M"),
        categories = Category::prompt_list(),
    )
}

/// 原始事件 → 草稿：标题缺失的条目丢弃，其余字段矫正或兜底
fn finalize_draft(
    raw: RawEvent,
    utterance: &str,
    today: NaiveDate,
    now: DateTime<FixedOffset>,
) -> Option<EventDraft> {
    let title = raw.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;

    let ai_date = raw
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .unwrap_or(today);
    // "on N" 式引用模型经常判错，统一按原话重算一遍
    let date = normalize_event_date(utterance, today, ai_date);

    Some(EventDraft {
        title,
        description: raw.description.unwrap_or_default(),
        category: Category::parse(raw.category.as_deref().unwrap_or("")),
        date,
        time: coerce_time(raw.time.as_deref(), now),
        reminder: ReminderOffset::parse(raw.reminder.as_deref()),
    })
}

/// 矫正时间：合法 HH:MM 规整为补零形式，占位符/缺失按时段给默认值
fn coerce_time(raw: Option<&str>, now: DateTime<FixedOffset>) -> String {
    if let Some(text) = raw {
        if let Some(time) = parse_hhmm(text) {
            return format!("{:02}:{:02}", time.hour(), time.minute());
        }
    }
    default_time(now)
}

/// 时段默认：上午 09:00，下午 15:00，晚间 19:00
fn default_time(now: DateTime<FixedOffset>) -> String {
    match now.hour() {
        0..=11 => "09:00",
        12..=17 => "15:00",
        _ => "19:00",
    }
    .to_string()
}

// ---------- 模式回退抽取 ----------

/// 关键词 → 规范标题与类别
const SUBJECT_MAP: [(&str, &str, Category); 12] = [
    ("gym", "Gym workout", Category::Fitness),
    ("workout", "Gym workout", Category::Fitness),
    ("meeting", "Meeting", Category::Meeting),
    ("interview", "Interview", Category::Work),
    ("lunch", "Lunch", Category::Social),
    ("dinner", "Dinner", Category::Social),
    ("breakfast", "Breakfast", Category::Social),
    ("dentist", "Dentist appointment", Category::Health),
    ("doctor", "Doctor appointment", Category::Health),
    ("call", "Phone call", Category::Work),
    ("class", "Class", Category::Learning),
    ("lecture", "Class", Category::Learning),
];

const FILLER_WORDS: [&str; 14] = [
    "i", "have", "a", "an", "my", "the", "there", "is", "schedule", "tomorrow", "today", "this",
    "next", "on",
];

fn subject_time_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([a-z][a-z '\-]*?)\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b")
            .expect("subject-time pattern compiles")
    })
}

fn and_splitter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+and\s+").expect("and splitter compiles"))
}

/// 确定性回退：扫描 "<主语> at <时间>"（逗号或 and 连接的多段），
/// 常见主语映射为规范标题，日期从字面日名推断，默认今天
pub fn fallback_extract(utterance: &str, today: NaiveDate) -> Vec<EventDraft> {
    let date = infer_date(utterance, today);
    let mut drafts = Vec::new();

    for chunk in utterance.split(',') {
        for segment in and_splitter().split(chunk) {
            let Some(caps) = subject_time_pattern().captures(segment) else {
                continue;
            };
            let Some(time) = segment_time(&caps) else {
                continue;
            };

            let (title, category) = canonical_subject(caps.get(1).map_or("", |m| m.as_str()));
            drafts.push(EventDraft {
                title,
                description: segment.trim().to_string(),
                category,
                date,
                time,
                reminder: ReminderOffset::DEFAULT,
            });
        }
    }

    drafts
}

fn segment_time(caps: &regex::Captures<'_>) -> Option<String> {
    let mut hour: u32 = caps.get(2)?.as_str().parse().ok()?;
    let minute: u32 = caps
        .get(3)
        .map_or(Ok(0), |m| m.as_str().parse())
        .ok()?;

    match caps.get(4).map(|m| m.as_str().to_lowercase()) {
        Some(ref ampm) if ampm == "pm" && hour < 12 => hour += 12,
        Some(ref ampm) if ampm == "am" && hour == 12 => hour = 0,
        _ => {}
    }

    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{:02}:{:02}", hour, minute))
}

/// 主语清洗 + 关键词映射；没有关键词时首字母大写原样使用
fn canonical_subject(raw: &str) -> (String, Category) {
    let lowered = raw.to_lowercase();
    for (keyword, title, category) in SUBJECT_MAP {
        if lowered.contains(keyword) {
            return (title.to_string(), category);
        }
    }

    let cleaned: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !FILLER_WORDS.contains(w) && !is_day_word(w))
        .collect();
    if cleaned.is_empty() {
        return ("Appointment".to_string(), Category::Personal);
    }

    let mut title = cleaned.join(" ");
    if let Some(first) = title.get(0..1) {
        let capitalized = first.to_uppercase();
        title.replace_range(0..1, &capitalized);
    }
    (title, Category::Personal)
}

fn is_day_word(word: &str) -> bool {
    weekday_from_name(word).is_some()
}

/// 字面日名 → 日期："tomorrow"、"today"、星期名（取下一次出现）
fn infer_date(utterance: &str, today: NaiveDate) -> NaiveDate {
    let lowered = utterance.to_lowercase();
    if lowered.contains("tomorrow") {
        return today + Duration::days(1);
    }
    if lowered.contains("today") {
        return today;
    }

    for word in lowered.split(|c: char| !c.is_ascii_alphabetic()) {
        if let Some(weekday) = weekday_from_name(word) {
            let ahead = (weekday.num_days_from_monday() + 7
                - today.weekday().num_days_from_monday())
                % 7;
            let ahead = if ahead == 0 { 7 } else { ahead };
            return today + Duration::days(ahead as i64);
        }
    }

    today
}

fn weekday_from_name(word: &str) -> Option<Weekday> {
    match word {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ist_offset;
    use crate::llm::{MockGenerator, ProviderError};
    use chrono::TimeZone;

    fn now_at(date: &str, hour: u32) -> DateTime<FixedOffset> {
        let date: NaiveDate = date.parse().expect("test date");
        ist_offset()
            .with_ymd_and_hms(date.year(), date.month(), date.day(), hour, 0, 0)
            .single()
            .expect("test datetime")
    }

    fn gateway_of(mock: MockGenerator) -> Arc<TextGateway> {
        Arc::new(TextGateway::new(
            vec![Arc::new(mock)],
            std::time::Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn test_extract_parses_and_normalizes() {
        let reply = r#"Here you go:
{
  "events": [
    {"title": "Dinner", "description": "with family", "category": "family",
     "date": "2025-09-29", "time": "19:00", "reminder": "30 minutes"}
  ]
}"#;
        let extractor = EventExtractor::new(gateway_of(MockGenerator::new().respond(reply)));
        // 原话说 "on 7"，模型给了今天：修正到下个月 7 号
        let drafts = extractor
            .extract("dinner on 7", now_at("2025-09-29", 10))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].date, "2025-10-07".parse::<NaiveDate>().unwrap());
        assert_eq!(drafts[0].category, Category::Family);
        assert_eq!(drafts[0].reminder, ReminderOffset::Minutes(30));
    }

    #[tokio::test]
    async fn test_extract_coerces_placeholder_time() {
        let reply = r#"{"events": [{"title": "Read a book", "date": "2025-09-30", "time": "TBD"}]}"#;
        let extractor = EventExtractor::new(gateway_of(MockGenerator::new().respond(reply)));
        let drafts = extractor
            .extract("read a book tomorrow", now_at("2025-09-29", 10))
            .await
            .unwrap();
        assert_eq!(drafts[0].time, "09:00");
        assert_eq!(drafts[0].category, Category::Personal);
        assert_eq!(drafts[0].reminder, ReminderOffset::DEFAULT);
    }

    #[tokio::test]
    async fn test_extract_repairs_truncated_output() {
        // 缺最后一个右括号
        let reply = "{\n\"events\": [\n{\"title\": \"Gym workout\", \"date\": \"2025-09-30\", \"time\": \"18:00\"}\n]\n";
        let extractor = EventExtractor::new(gateway_of(MockGenerator::new().respond(reply)));
        let drafts = extractor
            .extract("gym tomorrow at 6pm", now_at("2025-09-29", 10))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].time, "18:00");
    }

    #[tokio::test]
    async fn test_extract_unparseable_is_malformed() {
        let reply = "{\"events\": [{\"title\": \"Lun";
        let extractor = EventExtractor::new(gateway_of(MockGenerator::new().respond(reply)));
        let err = extractor
            .extract("lunch", now_at("2025-09-29", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::MalformedOutput));
    }

    #[tokio::test]
    async fn test_extract_drops_untitled_entries() {
        let reply = r#"{"events": [{"title": "  ", "date": "2025-09-30", "time": "10:00"},
                                    {"title": "Real", "date": "2025-09-30", "time": "10:00"}]}"#;
        let extractor = EventExtractor::new(gateway_of(MockGenerator::new().respond(reply)));
        let drafts = extractor
            .extract("stuff tomorrow", now_at("2025-09-29", 10))
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Real");
    }

    #[tokio::test]
    async fn test_gateway_down_falls_back_to_patterns() {
        let extractor = EventExtractor::new(gateway_of(
            MockGenerator::new().fail(ProviderError::Unconfigured),
        ));
        let drafts = extractor
            .extract(
                "meeting at 10am and lunch at 1pm tomorrow",
                now_at("2025-09-29", 8),
            )
            .await
            .unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "Meeting");
        assert_eq!(drafts[0].time, "10:00");
        assert_eq!(drafts[1].title, "Lunch");
        assert_eq!(drafts[1].time, "13:00");
        let tomorrow: NaiveDate = "2025-09-30".parse().unwrap();
        assert_eq!(drafts[0].date, tomorrow);
        assert_eq!(drafts[1].date, tomorrow);
    }

    #[tokio::test]
    async fn test_gateway_down_without_patterns_is_unavailable() {
        let extractor = EventExtractor::new(gateway_of(
            MockGenerator::new().fail(ProviderError::Unconfigured),
        ));
        let err = extractor
            .extract("please help me plan", now_at("2025-09-29", 8))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable));
    }

    #[test]
    fn test_fallback_subject_canonicalization() {
        let today: NaiveDate = "2025-09-29".parse().unwrap();
        let drafts = fallback_extract("i have a dentist at 3pm", today);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Dentist appointment");
        assert_eq!(drafts[0].category, Category::Health);
        assert_eq!(drafts[0].time, "15:00");
        assert_eq!(drafts[0].date, today);
    }

    #[test]
    fn test_fallback_unknown_subject_capitalized() {
        let today: NaiveDate = "2025-09-29".parse().unwrap();
        let drafts = fallback_extract("guitar practice at 17:30", today);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Guitar practice");
        assert_eq!(drafts[0].time, "17:30");
        assert_eq!(drafts[0].category, Category::Personal);
    }

    #[test]
    fn test_fallback_weekday_inference() {
        // 2025-09-29 是周一；"friday" → 同周周五
        let today: NaiveDate = "2025-09-29".parse().unwrap();
        let drafts = fallback_extract("badminton at 7pm on friday", today);
        assert_eq!(drafts[0].date, "2025-10-03".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_fallback_same_weekday_goes_next_week() {
        let today: NaiveDate = "2025-09-29".parse().unwrap();
        let drafts = fallback_extract("standup at 9am on monday", today);
        assert_eq!(drafts[0].date, "2025-10-06".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_fallback_ignores_nonsense_times() {
        let today: NaiveDate = "2025-09-29".parse().unwrap();
        assert!(fallback_extract("meet at 29pm", today).is_empty());
    }

    #[test]
    fn test_default_time_tiers() {
        assert_eq!(default_time(now_at("2025-09-29", 8)), "09:00");
        assert_eq!(default_time(now_at("2025-09-29", 14)), "15:00");
        assert_eq!(default_time(now_at("2025-09-29", 21)), "19:00");
    }
}
