//! Scout - AI 日程助理核心
//!
//! 将任意用户消息转化为日历操作：分类意图、通过多个文本生成后端抽取
//! 结构化事件、修正日期、检测排期冲突，并在无歧义时写入持久化存储。
//!
//! 模块划分：
//! - **clock**: 固定 IST 参考时钟（所有「当前时刻」解析的唯一来源）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **llm**: 文本生成网关与后端适配器（Gemini / Groq / Cohere / Mock）
//! - **scheduler**: 核心流水线（意图分类、事件抽取、日期修正、删除消解、
//!   冲突检测、提交编排）
//! - **store**: 事件持久化（EventStore trait + SQLite 实现）

pub mod clock;
pub mod config;
pub mod llm;
pub mod scheduler;
pub mod store;

pub use scheduler::{PendingConflict, ProcessOutcome, ScheduleAssistant};
