//! 固定时区参考时钟
//!
//! 部署参考时区为 IST（UTC+05:30），所有「今天 / 现在」的解析都经由这里，
//! 避免服务器本地时区渗入日期启发式。测试通过各入口的 `*_at` 变体注入时刻。

use chrono::{DateTime, FixedOffset, Utc};

/// IST 相对 UTC 的偏移秒数（+05:30）
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// IST 固定偏移
pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).expect("IST offset is in range")
}

/// 当前 IST 时刻
pub fn ist_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&ist_offset())
}
