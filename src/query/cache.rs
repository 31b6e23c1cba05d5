use std::{
    collections::HashMap,
    future::Future,
    marker::PhantomData,
    pin::Pin,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
    time::{self, Instant},
};

use super::{
    QueryKey, QueryOptions,
    state::{Payload, QueryState, QueryStatus, Snapshot},
};
use crate::error::Result;

type BoxFetch = Pin<Box<dyn Future<Output = Result<Payload>> + Send>>;
type Fetcher = Arc<dyn Fn() -> BoxFetch + Send + Sync>;

/// 一个查询键对应的缓存条目
struct Entry {
    /// 条目创建时分配的编号，区分被回收后同键的新条目
    serial: u64,
    state: watch::Sender<Snapshot>,
    /// 最近一次订阅提供的请求函数，失效后重新请求时使用
    fetcher: Fetcher,
    /// 最近一次派发的请求编号，只有该编号的结果会被写入
    generation: u64,
    in_flight: Option<AbortHandle>,
    invalidated: bool,
    /// 在锁内增减，不依赖 `receiver_count`
    subscribers: usize,
    inactive_since: Option<Instant>,
}

impl Entry {
    fn new(serial: u64, fetcher: Fetcher) -> Self {
        let (state, _) = watch::channel(Snapshot::pending());
        Self {
            serial,
            state,
            fetcher,
            generation: 0,
            in_flight: None,
            invalidated: false,
            subscribers: 0,
            inactive_since: None,
        }
    }

    /// 失效或上次请求失败的条目总是过期，否则按 `stale_time` 判断
    fn is_stale(&self, now: Instant, stale_time: Duration) -> bool {
        if self.invalidated {
            return true;
        }

        let state = self.state.borrow();
        if state.status == QueryStatus::Error {
            return true;
        }
        match state.updated_at {
            Some(at) => now.saturating_duration_since(at) >= stale_time,
            None => true,
        }
    }
}

struct Inner {
    options: QueryOptions,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    generation: AtomicU64,
}

/// 按键缓存的查询存储
///
/// - 同一个键同时最多只有一个请求在进行，并发订阅会合并到同一个请求
/// - 数据在 `stale_time` 内视为新鲜，过期后订阅会先返回旧数据再在后台刷新；
///   最近一次请求失败的条目不算新鲜，下一次订阅会重新请求
/// - 失败时按 `retry` 自动重试，重试同样只有一个请求
/// - [`QueryCache::invalidate`] 之后的订阅总会触发新的请求，只有最新派发的请求结果会被写入
/// - 没有订阅者的条目在 `gc_time` 后被 [`QueryCache::collect_garbage`] 回收
///
/// 在应用启动时创建并注入给使用方，不做持久化。
/// 订阅和失效操作会派发 tokio 任务，必须在 tokio 运行时中调用。
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

/// 对某个查询键的订阅
///
/// 持有期间可以读取最新快照并等待更新；最后一个订阅被丢弃后，条目开始计算闲置时间。
pub struct Subscription<T> {
    receiver: watch::Receiver<Snapshot>,
    key: QueryKey,
    serial: u64,
    inner: Arc<Inner>,
    _marker: PhantomData<fn() -> T>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

impl QueryCache {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                entries: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.inner.options
    }

    /// 订阅一个查询键
    ///
    /// 条目新鲜时直接复用，不调用 `fetcher`；否则派发一次请求。
    /// 已有请求进行中时只加入等待，不会再次请求。
    pub fn subscribe<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Subscription<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || {
            let fut = fetcher();
            Box::pin(async move { fut.await.map(|data| Arc::new(data) as Payload) }) as BoxFetch
        });

        let now = Instant::now();
        let mut entries = self.inner.entries();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(self.inner.next_number(), fetcher.clone()));

        entry.fetcher = fetcher;
        entry.subscribers += 1;
        entry.inactive_since = None;
        let receiver = entry.state.subscribe();
        let serial = entry.serial;

        // 失效前派发的请求不能满足失效后的订阅
        let refetch = entry.invalidated
            || (entry.in_flight.is_none() && entry.is_stale(now, self.inner.options.stale_time));
        if refetch {
            self.inner.dispatch(&key, entry);
        }
        drop(entries);

        Subscription {
            receiver,
            key,
            serial,
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }

    /// 将键标记为过期
    ///
    /// 有订阅者时立即重新请求（取代正在进行的请求），否则在下一次订阅时请求。
    pub fn invalidate(&self, key: &QueryKey) {
        self.invalidate_where(|k| k == key)
    }

    /// 将所有以 `prefix` 开头的键标记为过期
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        self.invalidate_where(|k| k.starts_with(prefix))
    }

    fn invalidate_where(&self, matches: impl Fn(&QueryKey) -> bool) {
        let mut entries = self.inner.entries();
        for (key, entry) in entries.iter_mut().filter(|(k, _)| matches(k)) {
            tracing::debug!(%key, subscribers = entry.subscribers, "invalidate");
            entry.invalidated = true;
            if entry.subscribers > 0 {
                self.inner.dispatch(key, entry);
            }
        }
    }

    /// 读取某个键当前的快照，不触发请求
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<QueryState<T>> {
        self.inner
            .entries()
            .get(key)
            .map(|entry| entry.state.borrow().typed())
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.entries().contains_key(key)
    }

    /// 回收闲置超过 `gc_time` 的条目，返回回收数量
    ///
    /// 有订阅者或请求进行中的条目不会被回收。
    pub fn collect_garbage(&self) -> usize {
        self.inner.collect_garbage()
    }

    /// 启动后台回收任务，缓存被释放后任务自动退出
    pub fn spawn_gc(&self) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let period = (self.inner.options.gc_time / 2).max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.collect_garbage();
            }
        })
    }

    /// 清空所有条目并取消进行中的请求，现有订阅会收到关闭通知
    pub fn clear(&self) {
        let mut entries = self.inner.entries();
        for entry in entries.values_mut() {
            if let Some(task) = entry.in_flight.take() {
                task.abort();
            }
        }
        entries.clear();
        tracing::debug!("query cache cleared");
    }
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 请求和条目共用的递增编号
    fn next_number(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 为条目派发一次新的请求，取代之前进行中的请求
    fn dispatch(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) {
        if let Some(previous) = entry.in_flight.take() {
            previous.abort();
            tracing::debug!(%key, generation = entry.generation, "superseded in-flight fetch");
        }

        let generation = self.next_number();
        entry.generation = generation;
        entry.invalidated = false;
        entry.state.send_modify(|s| s.is_fetching = true);

        tracing::debug!(%key, generation, "dispatch fetch");
        let task = tokio::spawn(run_fetch(
            Arc::downgrade(self),
            key.clone(),
            generation,
            entry.fetcher.clone(),
            self.options.clone(),
        ));
        entry.in_flight = Some(task.abort_handle());
    }

    /// 写入请求结果；编号不是最新的结果直接丢弃
    fn settle(&self, key: &QueryKey, generation: u64, outcome: Result<Payload>, attempts: u32) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            tracing::debug!(%key, generation, "entry gone, dropping result");
            return;
        };

        if entry.generation != generation {
            tracing::debug!(
                %key,
                generation,
                current = entry.generation,
                "discarding outdated result"
            );
            return;
        }

        entry.in_flight = None;
        let now = Instant::now();

        match outcome {
            Ok(data) => entry.state.send_modify(|s| {
                s.status = QueryStatus::Success;
                s.data = Some(data);
                s.error = None;
                s.updated_at = Some(now);
                s.failure_count = 0;
                s.is_fetching = false;
            }),
            Err(e) => {
                tracing::warn!(%key, attempts, error = %e, "fetch failed");
                let error = Arc::new(e);
                entry.state.send_modify(|s| {
                    s.status = QueryStatus::Error;
                    s.error = Some(error);
                    s.failure_count = attempts;
                    s.is_fetching = false;
                });
            }
        }

        if entry.subscribers == 0 && entry.inactive_since.is_none() {
            entry.inactive_since = Some(now);
        }
    }

    fn release(&self, key: &QueryKey, serial: u64) {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key).filter(|e| e.serial == serial) else {
            return;
        };

        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers == 0 {
            entry.inactive_since = Some(Instant::now());
        }
    }

    fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.options.gc_time;
        let mut entries = self.entries();
        let before = entries.len();

        entries.retain(|key, entry| {
            let expired = entry.in_flight.is_none()
                && entry.subscribers == 0
                && entry
                    .inactive_since
                    .is_some_and(|since| now.saturating_duration_since(since) >= gc_time);
            if expired {
                tracing::debug!(%key, "evict inactive entry");
            }
            !expired
        });

        before - entries.len()
    }
}

/// 执行请求并按配置重试，完成后把结果交回缓存
async fn run_fetch(
    inner: Weak<Inner>,
    key: QueryKey,
    generation: u64,
    fetcher: Fetcher,
    options: QueryOptions,
) {
    let mut attempt = 0;
    let outcome = loop {
        match fetcher().await {
            Ok(data) => break Ok(data),
            Err(e) if attempt < options.retry => {
                attempt += 1;
                let delay = options.retry_backoff(attempt);
                tracing::debug!(%key, attempt, error = %e, ?delay, "fetch failed, retrying");
                time::sleep(delay).await;
            }
            Err(e) => break Err(e),
        }
    };

    if let Some(inner) = inner.upgrade() {
        inner.settle(&key, generation, outcome, attempt + 1);
    }
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// 当前快照
    pub fn state(&self) -> QueryState<T> {
        self.receiver.borrow().typed()
    }

    /// 等待下一次更新；缓存被清空后返回 `None`
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().typed())
    }

    /// 等待请求结束并得到成功或失败的结论
    pub async fn settled(&mut self) -> QueryState<T> {
        let settled = self
            .receiver
            .wait_for(Snapshot::is_settled)
            .await
            .map(|snapshot| snapshot.typed())
            .ok();
        settled.unwrap_or_else(|| self.state())
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.inner.release(&self.key, self.serial);
    }
}
