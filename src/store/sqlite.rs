//! SQLite 事件存储
//!
//! 单连接 + Mutex，每次写入是独立事务语句；批量创建/删除循环里
//! 逐条提交，中途失败时已提交的条目保持不变（见编排器的批次语义）。

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::Connection;

use super::{EventRecord, EventStore, NewEvent, StoreError};

/// events 表：除核心字段外，保留完成标志、提醒设置/时刻与四个提醒已触发标志
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id           INTEGER NOT NULL,
    title             TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    category          TEXT NOT NULL DEFAULT 'personal',
    date              TEXT NOT NULL,
    time              TEXT NOT NULL,
    done              INTEGER NOT NULL DEFAULT 0,
    reminder_setting  TEXT NOT NULL DEFAULT '15 minutes',
    reminder_datetime TEXT,
    reminde1          INTEGER NOT NULL DEFAULT 0,
    reminde2          INTEGER NOT NULL DEFAULT 0,
    reminde3          INTEGER NOT NULL DEFAULT 0,
    reminde4          INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_events_user_date ON events (user_id, date);
";

/// SQLite 实现
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 打开（或创建）磁盘数据库
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl EventStore for SqliteStore {
    fn insert_event(&self, event: &NewEvent) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO events
             (user_id, title, description, category, date, time, done,
              reminder_setting, reminder_datetime, reminde1, reminde2, reminde3, reminde4)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, 0, 0, 0, 0)",
            rusqlite::params![
                event.user_id,
                event.title,
                event.description,
                event.category,
                event.date,
                event.time,
                event.reminder_setting,
                event.reminder_datetime,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn delete_event(&self, event_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM events WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![event_id, user_id],
        )?;
        Ok(affected > 0)
    }

    fn query_events(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: Option<NaiveDate>,
        done: Option<bool>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let conn = self.lock()?;

        let mut sql = String::from(
            "SELECT id, title, description, category, date, time, done
             FROM events WHERE user_id = ? AND date >= ?",
        );
        let mut params: Vec<&dyn rusqlite::ToSql> = vec![&user_id, &from];
        if let Some(ref to) = to {
            sql.push_str(" AND date <= ?");
            params.push(to);
        }
        if let Some(ref done) = done {
            sql.push_str(" AND done = ?");
            params.push(done);
        }
        sql.push_str(" ORDER BY date, time");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok(EventRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                category: row.get(3)?,
                date: row.get(4)?,
                time: row.get(5)?,
                done: row.get(6)?,
            })
        })?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn event(user_id: i64, title: &str, date: &str, time: &str) -> NewEvent {
        let date: NaiveDate = date.parse().expect("test date");
        NewEvent {
            user_id,
            title: title.to_string(),
            description: String::new(),
            category: "personal".to_string(),
            date,
            time: time.to_string(),
            reminder_setting: "15 minutes".to_string(),
            reminder_datetime: NaiveDateTime::new(
                date,
                chrono::NaiveTime::from_hms_opt(8, 45, 0).expect("test time"),
            ),
        }
    }

    #[test]
    fn test_insert_and_query() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .insert_event(&event(1, "Lunch", "2025-09-30", "13:00"))
            .unwrap();
        assert!(id > 0);

        let from: NaiveDate = "2025-09-29".parse().unwrap();
        let events = store.query_events(1, from, None, Some(false)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Lunch");
        assert_eq!(events[0].time, "13:00");
        assert!(!events[0].done);
    }

    #[test]
    fn test_query_respects_range_and_user() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_event(&event(1, "Early", "2025-09-01", "09:00"))
            .unwrap();
        store
            .insert_event(&event(1, "Late", "2025-10-15", "09:00"))
            .unwrap();
        store
            .insert_event(&event(2, "Other user", "2025-09-20", "09:00"))
            .unwrap();

        let from: NaiveDate = "2025-08-01".parse().unwrap();
        let to: NaiveDate = "2025-09-30".parse().unwrap();
        let events = store.query_events(1, from, Some(to), None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Early");
    }

    #[test]
    fn test_delete_scoped_to_owner() {
        let store = SqliteStore::in_memory().unwrap();
        let id = store
            .insert_event(&event(1, "Dentist appointment", "2025-09-30", "14:00"))
            .unwrap();

        // 其他用户删不掉
        assert!(!store.delete_event(id, 2).unwrap());
        // 所有者可以删除，再删返回 false
        assert!(store.delete_event(id, 1).unwrap());
        assert!(!store.delete_event(id, 1).unwrap());
    }
}
