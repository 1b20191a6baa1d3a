//! # 时钟
//!
//! store 内部所有时间戳（`added_at`、`last_accessed`、`last_modified` 等）都通过
//! 注入的 `Clock` 读取，生产环境使用系统时钟，测试中使用单调递增的手动时钟，
//! 以便对"最久未访问"淘汰顺序做确定性断言。

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 返回当前 Unix 毫秒时间戳的时钟
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// 当前系统时间（Unix 毫秒）
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// 系统时钟
pub fn system_clock() -> Clock {
    Arc::new(now_millis)
}

/// 测试用手动时钟：每次读取返回上一次的值加 1
#[cfg(test)]
pub fn ticking_clock(start: i64) -> Clock {
    use std::sync::atomic::{AtomicI64, Ordering};

    let counter = Arc::new(AtomicI64::new(start));
    Arc::new(move || counter.fetch_add(1, Ordering::SeqCst))
}
