use std::{any::Any, sync::Arc};

use tokio::time::Instant;

use crate::error::Error;

pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// 查询状态
///
/// - [`QueryStatus::Pending`]：还没有任何结果
/// - [`QueryStatus::Success`]：最近一次请求成功
/// - [`QueryStatus::Error`]：最近一次请求（含重试）失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Pending,
    Success,
    Error,
}

/// 某个查询键在某一时刻的完整快照
///
/// `status`、`data`、`error` 总是一起发布，读取方不会看到半更新的状态。
/// 刷新失败时保留上一次成功的 `data`。
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<Error>>,
    /// 是否有请求正在进行（包括后台刷新）
    pub is_fetching: bool,
    /// 最近一次成功的时间
    pub updated_at: Option<Instant>,
    /// 最近一次失败前的尝试次数
    pub failure_count: u32,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
            failure_count: self.failure_count,
        }
    }
}

impl<T> QueryState<T> {
    /// 首次加载中：没有数据且请求进行中
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.is_fetching
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

/// 缓存内部保存的类型擦除快照
#[derive(Clone)]
pub(crate) struct Snapshot {
    pub status: QueryStatus,
    pub data: Option<Payload>,
    pub error: Option<Arc<Error>>,
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
    pub failure_count: u32,
}

impl Snapshot {
    pub fn pending() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
            failure_count: 0,
        }
    }

    /// 请求结束且已有结论
    pub fn is_settled(&self) -> bool {
        !self.is_fetching && self.status != QueryStatus::Pending
    }

    /// 转换为具体类型的快照；类型不符时 `data` 为空
    pub fn typed<T: Send + Sync + 'static>(&self) -> QueryState<T> {
        QueryState {
            status: self.status,
            data: self.data.clone().and_then(|d| d.downcast::<T>().ok()),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
            failure_count: self.failure_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_downcast() {
        let snapshot = Snapshot {
            status: QueryStatus::Success,
            data: Some(Arc::new(vec![1u8, 2, 3]) as Payload),
            ..Snapshot::pending()
        };

        let state = snapshot.typed::<Vec<u8>>();
        assert!(state.is_success());
        assert_eq!(state.data.as_deref(), Some(&vec![1, 2, 3]));

        // 类型不匹配时不返回数据
        assert!(snapshot.typed::<String>().data.is_none());
    }

    #[test]
    fn test_pending_is_not_settled() {
        let mut snapshot = Snapshot::pending();
        assert!(!snapshot.is_settled());

        snapshot.status = QueryStatus::Error;
        snapshot.is_fetching = true;
        assert!(!snapshot.is_settled());

        snapshot.is_fetching = false;
        assert!(snapshot.is_settled());
    }
}
