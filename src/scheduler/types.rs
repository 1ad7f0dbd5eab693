//! 核心数据模型：事件草稿、类别、提醒偏移、冲突记录、处理结果

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// 事件类别（封闭集合）；未知输入一律落到 Personal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Home,
    Sports,
    Fun,
    Health,
    Fitness,
    Personal,
    Learning,
    Finance,
    Errands,
    Cleaning,
    Gardening,
    Cooking,
    Pets,
    Meeting,
    Commute,
    Networking,
    Admin,
    Social,
    Entertainment,
    Travel,
    Hobby,
    Volunteering,
    Important,
    #[serde(rename = "to-do")]
    ToDo,
    Later,
    Family,
}

impl Category {
    pub const ALL: [Category; 27] = [
        Category::Work,
        Category::Home,
        Category::Sports,
        Category::Fun,
        Category::Health,
        Category::Fitness,
        Category::Personal,
        Category::Learning,
        Category::Finance,
        Category::Errands,
        Category::Cleaning,
        Category::Gardening,
        Category::Cooking,
        Category::Pets,
        Category::Meeting,
        Category::Commute,
        Category::Networking,
        Category::Admin,
        Category::Social,
        Category::Entertainment,
        Category::Travel,
        Category::Hobby,
        Category::Volunteering,
        Category::Important,
        Category::ToDo,
        Category::Later,
        Category::Family,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Home => "home",
            Category::Sports => "sports",
            Category::Fun => "fun",
            Category::Health => "health",
            Category::Fitness => "fitness",
            Category::Personal => "personal",
            Category::Learning => "learning",
            Category::Finance => "finance",
            Category::Errands => "errands",
            Category::Cleaning => "cleaning",
            Category::Gardening => "gardening",
            Category::Cooking => "cooking",
            Category::Pets => "pets",
            Category::Meeting => "meeting",
            Category::Commute => "commute",
            Category::Networking => "networking",
            Category::Admin => "admin",
            Category::Social => "social",
            Category::Entertainment => "entertainment",
            Category::Travel => "travel",
            Category::Hobby => "hobby",
            Category::Volunteering => "volunteering",
            Category::Important => "important",
            Category::ToDo => "to-do",
            Category::Later => "later",
            Category::Family => "family",
        }
    }

    /// 宽容解析：大小写/空白不敏感，未知值回落 Personal
    pub fn parse(input: &str) -> Category {
        let normalized = input.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .unwrap_or(Category::Personal)
    }

    /// 提示词里用的类别枚举列表
    pub fn prompt_list() -> String {
        Category::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 提醒偏移：事件时刻之前多久触发提醒
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderOffset {
    Minutes(u32),
    Hours(u32),
    Days(u32),
    None,
}

impl ReminderOffset {
    pub const DEFAULT: ReminderOffset = ReminderOffset::Minutes(15);

    /// 从 "15 minutes" / "1 hour" / "2 days" / "none" 这类文本解析；
    /// 缺失或无法解析时使用默认 15 分钟
    pub fn parse(input: Option<&str>) -> ReminderOffset {
        let Some(text) = input else {
            return ReminderOffset::DEFAULT;
        };
        let text = text.trim().to_lowercase();
        if text == "none" || text == "no reminder" {
            return ReminderOffset::None;
        }

        let mut parts = text.split_whitespace();
        let amount: Option<u32> = parts.next().and_then(|n| n.parse().ok());
        let unit = parts.next().unwrap_or("");

        match (amount, unit) {
            (Some(n), u) if u.starts_with("minute") => ReminderOffset::Minutes(n),
            (Some(n), u) if u.starts_with("hour") => ReminderOffset::Hours(n),
            (Some(n), u) if u.starts_with("day") => ReminderOffset::Days(n),
            _ => ReminderOffset::DEFAULT,
        }
    }

    pub fn to_duration(self) -> Duration {
        match self {
            ReminderOffset::Minutes(n) => Duration::minutes(n as i64),
            ReminderOffset::Hours(n) => Duration::hours(n as i64),
            ReminderOffset::Days(n) => Duration::days(n as i64),
            ReminderOffset::None => Duration::zero(),
        }
    }

    /// 持久化存储使用的原文形式
    pub fn label(self) -> String {
        match self {
            ReminderOffset::Minutes(n) => format!("{} minute{}", n, plural(n)),
            ReminderOffset::Hours(n) => format!("{} hour{}", n, plural(n)),
            ReminderOffset::Days(n) => format!("{} day{}", n, plural(n)),
            ReminderOffset::None => "none".to_string(),
        }
    }
}

fn plural(n: u32) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// 抽取产出的事件草稿，尚未持久化、没有身份
///
/// 不变式：time 恒为合法的 24 小时制 HH:MM，离开抽取器前必须被矫正。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub date: NaiveDate,
    pub time: String,
    pub reminder: ReminderOffset,
}

/// 冲突检测产出：引用一条既有事件及与草稿的绝对分钟差
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    pub event_id: i64,
    pub title: String,
    pub time: String,
    pub category: String,
    pub time_diff_minutes: i64,
}

/// 单槽会话态：每个用户会话同一时刻至多一个待确认草稿。
/// 由调用方（会话层）在多次 ProcessMessage 之间保存。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConflict {
    pub user_id: i64,
    pub draft: EventDraft,
}

/// 一次消息处理的终态结果
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub success: bool,
    pub message: String,
    pub events_created: bool,
    pub conflict_detected: bool,
    /// 本次提交成功的事件数
    pub created_count: usize,
    /// 本次确认删除的事件标题
    pub deleted_titles: Vec<String>,
}

impl ProcessOutcome {
    pub fn reply(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            events_created: false,
            conflict_detected: false,
            created_count: 0,
            deleted_titles: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            events_created: false,
            conflict_detected: false,
            created_count: 0,
            deleted_titles: Vec::new(),
        }
    }
}

/// 解析 24 小时制 HH:MM（小时 0-23，分钟 0-59）；容忍个位小时 "9:30"
pub fn parse_hhmm(text: &str) -> Option<NaiveTime> {
    let (h, m) = text.trim().split_once(':')?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = m.trim().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// HH:MM 转为当日分钟数
pub fn minutes_since_midnight(text: &str) -> Option<i64> {
    use chrono::Timelike;
    let time = parse_hhmm(text)?;
    Some(time.hour() as i64 * 60 + time.minute() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_known_and_unknown() {
        assert_eq!(Category::parse("Work"), Category::Work);
        assert_eq!(Category::parse(" to-do "), Category::ToDo);
        assert_eq!(Category::parse("quantum"), Category::Personal);
        assert_eq!(Category::parse(""), Category::Personal);
    }

    #[test]
    fn test_category_prompt_list_is_closed_set() {
        let list = Category::prompt_list();
        assert!(list.starts_with("work, home"));
        assert!(list.contains("to-do"));
        assert_eq!(list.split(", ").count(), 27);
    }

    #[test]
    fn test_reminder_parse() {
        assert_eq!(
            ReminderOffset::parse(Some("15 minutes")),
            ReminderOffset::Minutes(15)
        );
        assert_eq!(
            ReminderOffset::parse(Some("1 hour")),
            ReminderOffset::Hours(1)
        );
        assert_eq!(ReminderOffset::parse(Some("2 days")), ReminderOffset::Days(2));
        assert_eq!(ReminderOffset::parse(Some("none")), ReminderOffset::None);
        assert_eq!(ReminderOffset::parse(Some("whenever")), ReminderOffset::DEFAULT);
        assert_eq!(ReminderOffset::parse(None), ReminderOffset::DEFAULT);
    }

    #[test]
    fn test_reminder_label_round_trip() {
        assert_eq!(ReminderOffset::Minutes(15).label(), "15 minutes");
        assert_eq!(ReminderOffset::Hours(1).label(), "1 hour");
        assert_eq!(
            ReminderOffset::parse(Some(&ReminderOffset::Days(1).label())),
            ReminderOffset::Days(1)
        );
    }

    #[test]
    fn test_parse_hhmm_bounds() {
        assert!(parse_hhmm("00:00").is_some());
        assert!(parse_hhmm("23:59").is_some());
        assert!(parse_hhmm("9:30").is_some());
        assert!(parse_hhmm("24:00").is_none());
        assert!(parse_hhmm("12:60").is_none());
        assert!(parse_hhmm("TBD").is_none());
        assert!(parse_hhmm("").is_none());
    }

    #[test]
    fn test_minutes_since_midnight() {
        assert_eq!(minutes_since_midnight("14:30"), Some(870));
        assert_eq!(minutes_since_midnight("00:00"), Some(0));
        assert_eq!(minutes_since_midnight("unset"), None);
    }
}
