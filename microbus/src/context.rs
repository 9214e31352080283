use crate::dispatch::{EventLoop, EventLoopConfig};
use crate::error::BusResult;
use crate::event_bus::EventBus;
use crate::subscription::SubscriptionId;
use std::any::Any;
use std::sync::Arc;

/// 共享上下文：一个注册表 + 一个事件循环
///
/// 把二者绑定在一起，调用方投递时无需再显式传入注册表句柄。
/// 除组合关系外不引入额外状态；同步触发请通过 [`SharedContext::bus`] 进行。
///
/// ```rust
/// use microbus::SharedContext;
///
/// let context = SharedContext::new()?;
/// let id = context.subscribe("OnNumber", |n: &i32| println!("number {n}"));
/// context.enqueue("OnNumber", 69_i32)?;
/// context.wait_until_finished();
/// context.unsubscribe("OnNumber", id);
/// context.stop();
/// # Ok::<(), microbus::BusError>(())
/// ```
#[derive(Debug)]
pub struct SharedContext {
    bus: Arc<EventBus>,
    event_loop: EventLoop,
}

impl SharedContext {
    pub fn new() -> BusResult<Self> {
        Self::with_config(EventLoopConfig::default())
    }

    pub fn with_config(config: EventLoopConfig) -> BusResult<Self> {
        Ok(Self {
            bus: Arc::new(EventBus::new()),
            event_loop: EventLoop::with_config(config)?,
        })
    }

    pub fn subscribe<A, F>(&self, event_name: impl Into<String>, handler: F) -> SubscriptionId
    where
        A: Any + Send + Sync,
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.bus.subscribe(event_name, handler)
    }

    pub fn unsubscribe(&self, event_name: &str, id: SubscriptionId) {
        self.bus.unsubscribe(event_name, id);
    }

    /// 投递到自有事件循环，目标为自有注册表
    pub fn enqueue<A>(&self, event_name: impl Into<String>, args: A) -> BusResult<()>
    where
        A: Any + Send + Sync,
    {
        self.event_loop.enqueue(&self.bus, event_name, args)
    }

    pub fn wait_until_finished(&self) {
        self.event_loop.wait_until_finished();
    }

    pub fn stop(&self) {
        self.event_loop.stop();
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}
