//! 日程流水线
//!
//! 消息进入后按固定顺序流经：意图分类（intent）→ 事件抽取与日期矫正
//! （extract / normalize，JSON 修复见 repair）或删除消解（delete）→
//! 冲突检测（conflict）→ 提交编排（orchestrator）。types 承载贯穿
//! 各阶段的数据模型。

pub mod conflict;
pub mod delete;
pub mod extract;
pub mod intent;
pub mod normalize;
pub mod orchestrator;
pub mod repair;
pub mod types;

pub use intent::Intent;
pub use orchestrator::ScheduleAssistant;
pub use types::{
    Category, ConflictRecord, EventDraft, PendingConflict, ProcessOutcome, ReminderOffset,
};
