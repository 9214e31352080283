//! 事件注册表（EventBus）
//!
//! 维护「事件名 -> 有序的 (订阅 ID, 处理器单元) 列表」：
//! - `subscribe` / `unsubscribe` / `clear` 需要独占访问（分片写锁）；
//! - `trigger` / `trigger_bundle` 只需共享访问（分片读锁），多个线程可并行触发；
//! - 同一事件名内的处理器按订阅顺序依次在调用线程上同步执行；
//! - 列表被清空的事件名会立即从映射中移除；
//! - 外层闸门（`gate`）：`clear` 独占，其余操作共享，`clear` 对所有事件名一次性生效。
//!
//! 注意：处理器在读锁内执行。处理器内部再对同一个注册表调用
//! `subscribe`/`unsubscribe`/`clear`/`trigger` 可能死锁，该约束由调用方保证。
//!
use crate::error::{BusError, BusResult};
use crate::handler::{ArgBundle, HandlerCell};
use crate::subscription::SubscriptionId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

type HandlerList = Vec<(SubscriptionId, HandlerCell)>;

/// 基于内存的事件注册表
/// - 按事件名分区，不同事件名互不影响
/// - 订阅 ID 由实例内的原子计数器分配，多个实例之间互相独立
pub struct EventBus {
    subscribers: DashMap<String, HandlerList>,
    // 加锁顺序：先 gate，后分片
    gate: RwLock<()>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self {
            subscribers: DashMap::new(),
            gate: RwLock::new(()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件，返回用于退订的 ID
    ///
    /// 处理器的参数类型 `A` 即该事件的参数形状，多参数请使用元组。
    pub fn subscribe<A, F>(&self, event_name: impl Into<String>, handler: F) -> SubscriptionId
    where
        A: Any + Send + Sync,
        F: Fn(&A) + Send + Sync + 'static,
    {
        let cell = HandlerCell::new(handler);
        let args_type = cell.args_type();

        let _gate = self.gate.read();
        let mut handlers = self.subscribers.entry(event_name.into()).or_default();
        // 在写锁内分配 ID，保证同一事件名下 ID 顺序与派发顺序一致
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        handlers.push((id, cell));

        debug!(event = %handlers.key(), %id, args_type, "subscribed");
        id
    }

    /// 退订；事件名或 ID 不存在时为 no-op
    ///
    /// 删除处理器与移除空列表在同一个分片写锁内完成，外部看不到空的事件名。
    pub fn unsubscribe(&self, event_name: &str, id: SubscriptionId) {
        let _gate = self.gate.read();
        let removed = match self.subscribers.entry(event_name.to_string()) {
            Entry::Occupied(mut entry) => {
                let handlers = entry.get_mut();
                let before = handlers.len();
                handlers.retain(|(sid, _)| *sid != id);
                let removed = before - handlers.len();
                if entry.get().is_empty() {
                    entry.remove();
                }
                removed
            }
            Entry::Vacant(_) => 0,
        };

        if removed == 0 {
            trace!(event = event_name, %id, "unsubscribe: nothing to remove");
        } else {
            debug!(event = event_name, %id, "unsubscribed");
        }
    }

    /// 同步触发事件：在当前线程上按订阅顺序调用全部处理器
    ///
    /// 每次调用都会构造新的参数包。没有订阅者时直接返回 `Ok(())`。
    pub fn trigger<A>(&self, event_name: &str, args: A) -> BusResult<()>
    where
        A: Any + Send + Sync,
    {
        self.trigger_bundle(event_name, &ArgBundle::new(args))
    }

    /// 以已构造好的参数包触发事件
    ///
    /// 事件循环的工作线程通过该入口派发任务；锁与顺序语义与 `trigger` 相同。
    /// 参数类型不匹配的处理器会被跳过，其余处理器照常执行，最终返回第一个不匹配错误。
    pub fn trigger_bundle(&self, event_name: &str, args: &ArgBundle) -> BusResult<()> {
        let _gate = self.gate.read();
        let Some(handlers) = self.subscribers.get(event_name) else {
            trace!(event = event_name, "trigger: no subscribers");
            return Ok(());
        };

        trace!(event = event_name, handlers = handlers.len(), "dispatching");

        let mut first_err: Option<BusError> = None;
        for (id, cell) in handlers.value().iter() {
            if let Err(err) = cell.invoke(args) {
                warn!(event = event_name, %id, error = %err, "handler skipped");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// 清空全部订阅
    ///
    /// 持有闸门写锁：等待进行中的触发与订阅结束，期间的其他操作要么完全在清空之前，
    /// 要么完全在清空之后。
    pub fn clear(&self) {
        let _gate = self.gate.write();
        self.subscribers.clear();
        debug!("all subscriptions cleared");
    }

    pub fn has_subscribers(&self, event_name: &str) -> bool {
        let _gate = self.gate.read();
        self.subscribers.contains_key(event_name)
    }

    pub fn subscriber_count(&self, event_name: &str) -> usize {
        let _gate = self.gate.read();
        self.subscribers
            .get(event_name)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    /// 当前存在订阅的事件名（按字典序，只读视图）
    pub fn event_names(&self) -> Vec<String> {
        let _gate = self.gate.read();
        let mut names: Vec<String> = self.subscribers.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        let _gate = self.gate.read();
        self.subscribers.is_empty()
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.subscribers.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
