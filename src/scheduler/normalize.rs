//! 日期修正启发式
//!
//! 模型对 "on 5" 这类日期引用经常直接当成「今天」，这里在抽取之后
//! 用纯函数按原话重算。两条规则相互独立：
//! - 规则 2（"<月份名> N"）更具体，先检查，命中即返回；
//! - 规则 1（独立的 "on N"）仅在模型给的日期等于今天且 N 不是今天的
//!   日号时介入。
//! 两者都不命中时原样返回模型日期。

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// 按用户原话修正模型给出的事件日期
pub fn normalize_event_date(utterance: &str, today: NaiveDate, ai_date: NaiveDate) -> NaiveDate {
    if let Some(date) = month_day_reference(utterance, today) {
        return date;
    }
    if let Some(date) = day_of_month_reference(utterance, today, ai_date) {
        return date;
    }
    ai_date
}

fn month_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(january|jan|february|feb|march|mar|april|apr|may|june|jun|july|jul|august|aug|september|sep|sept|october|oct|november|nov|december|dec)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b",
        )
        .expect("month pattern compiles")
    })
}

fn on_day_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bon\s+(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)?\b")
            .expect("on-day pattern compiles")
    })
}

/// 规则 2："<月份名> N" → 当年该月该日，已过则推到明年
fn month_day_reference(utterance: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = month_pattern().captures(utterance)?;
    let month = month_number(caps.get(1)?.as_str())?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;

    let mut year = today.year();
    if day == 0 || day > days_in_month(year, month) {
        return None;
    }

    let mut resolved = NaiveDate::from_ymd_opt(year, month, day)?;
    if resolved < today {
        year += 1;
        if day > days_in_month(year, month) {
            return None;
        }
        resolved = NaiveDate::from_ymd_opt(year, month, day)?;
    }
    Some(resolved)
}

/// 规则 1：独立的 "on N"，仅当模型日期 == 今天且 N != 今天的日号
fn day_of_month_reference(
    utterance: &str,
    today: NaiveDate,
    ai_date: NaiveDate,
) -> Option<NaiveDate> {
    let caps = on_day_pattern().captures(utterance)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    if ai_date != today || day == today.day() {
        return None;
    }

    let (mut year, mut month) = (today.year(), today.month());
    // N 已过或本月放不下：滚到下个月
    if day < today.day() || day > days_in_month(year, month) {
        (year, month) = next_month(year, month);
    }
    // 对解析出的月份再验证一次日号，不合法再滚一个月
    if day > days_in_month(year, month) {
        (year, month) = next_month(year, month);
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn month_number(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}
