use std::time::Duration;

use serde::Deserialize;

use crate::config::duration_ms;

/// 重试退避的上限
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// [`QueryCache`](super::QueryCache) 的行为参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// 数据在多长时间内视为新鲜，新鲜的数据被订阅时不会重新请求
    #[serde(rename = "stale_time_ms", deserialize_with = "duration_ms")]
    pub stale_time: Duration,

    /// 没有订阅者的条目保留多久后被回收
    #[serde(rename = "gc_time_ms", deserialize_with = "duration_ms")]
    pub gc_time: Duration,

    /// 失败后的自动重试次数
    pub retry: u32,

    /// 第一次重试前的等待时间，之后每次翻倍
    #[serde(rename = "retry_delay_ms", deserialize_with = "duration_ms")]
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(5 * 60),
            retry: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl QueryOptions {
    /// 第 `attempt` 次重试（从 1 开始）前的等待时间
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.retry_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}
