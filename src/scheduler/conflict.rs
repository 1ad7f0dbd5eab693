//! 排期冲突检测
//!
//! 纯函数、不出外呼：把候选时间与当日既有事件的时间都折算成
//! 当日分钟数，120 分钟（含）以内视为冲突，按绝对分钟差排序。

use crate::store::EventRecord;

use super::types::{minutes_since_midnight, ConflictRecord, EventDraft};

/// 冲突窗口：与既有事件相差不超过 120 分钟（含）
const CONFLICT_WINDOW_MINUTES: i64 = 120;

/// 对同日既有事件做近邻检查；返回按时间差升序的冲突记录
pub fn find_conflicts(candidate_time: &str, existing: &[EventRecord]) -> Vec<ConflictRecord> {
    let Some(candidate) = minutes_since_midnight(candidate_time) else {
        return Vec::new();
    };

    let mut conflicts: Vec<ConflictRecord> = existing
        .iter()
        .filter_map(|event| {
            let minutes = minutes_since_midnight(&event.time)?;
            let diff = (candidate - minutes).abs();
            (diff <= CONFLICT_WINDOW_MINUTES).then(|| ConflictRecord {
                event_id: event.id,
                title: event.title.clone(),
                time: event.time.clone(),
                category: event.category.clone(),
                time_diff_minutes: diff,
            })
        })
        .collect();

    conflicts.sort_by_key(|c| c.time_diff_minutes);
    conflicts
}

/// 渲染冲突警告：每条冲突一行，按时间差分三档标注，结尾是 yes/no 确认
pub fn build_warning(draft: &EventDraft, conflicts: &[ConflictRecord]) -> String {
    let mut message = format!(
        "\"{}\" at {} on {} is close to your existing schedule:\n",
        draft.title, draft.time, draft.date
    );

    for conflict in conflicts {
        let proximity = if conflict.time_diff_minutes == 0 {
            "EXACT SAME TIME".to_string()
        } else if conflict.time_diff_minutes <= 30 {
            format!("{} minutes apart", conflict.time_diff_minutes)
        } else {
            format!(
                "{}h {}m apart",
                conflict.time_diff_minutes / 60,
                conflict.time_diff_minutes % 60
            )
        };
        message.push_str(&format!(
            "- \"{}\" at {} ({}): {}\n",
            conflict.title, conflict.time, conflict.category, proximity
        ));
    }

    message.push_str("Do you want to schedule it anyway? (yes/no)");
    message
}
