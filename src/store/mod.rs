//! 事件持久化
//!
//! 核心流水线只需要三个能力：插入事件、按 (id, user_id) 删除事件、
//! 按用户与日期范围查询事件。其余 CRUD 属于核心之外的协作方。

pub mod sqlite;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

pub use sqlite::SqliteStore;

/// 持久化层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store connection lock poisoned")]
    LockPoisoned,
}

/// 待插入的事件行（done 恒为 false，提醒触发标志全部未触发）
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    /// 24 小时制 HH:MM
    pub time: String,
    /// 提醒设置的原文，如 "15 minutes"
    pub reminder_setting: String,
    /// 事件时刻减去提醒偏移
    pub reminder_datetime: NaiveDateTime,
}

/// 查询返回的事件行
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub time: String,
    pub done: bool,
}

/// 持久化能力接口；实现必须保证删除以 (event_id, user_id) 同时匹配，
/// 属于其他用户的 id 不可删除。
pub trait EventStore: Send + Sync {
    /// 插入事件，返回持久化 id
    fn insert_event(&self, event: &NewEvent) -> Result<i64, StoreError>;

    /// 删除事件；true 当且仅当同时匹配 id 与所有者的行被删除
    fn delete_event(&self, event_id: i64, user_id: i64) -> Result<bool, StoreError>;

    /// 按用户与日期范围查询，可选按完成标志过滤；按日期、时间排序
    fn query_events(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: Option<NaiveDate>,
        done: Option<bool>,
    ) -> Result<Vec<EventRecord>, StoreError>;
}
